//! Mapping of transport responses onto dispatch outcomes

use mobilerest_domain::{DispatchError, HttpResponse, Outcome};

/// What a single attempt's response means for the request
#[derive(Debug)]
pub(crate) enum Classification {
    /// Delivered to the caller as is
    Final(Result<Outcome, DispatchError>),
    /// The credentials were rejected; refresh and resend if budget allows
    AuthInvalid(HttpResponse),
}

pub(crate) fn classify(response: HttpResponse) -> Classification {
    if response.is_success() {
        Classification::Final(Ok(Outcome::Success(response)))
    } else if response.is_not_found() {
        Classification::Final(Ok(Outcome::Absent(response)))
    } else if response.is_auth_invalid() {
        Classification::AuthInvalid(response)
    } else {
        Classification::Final(Err(DispatchError::ServerError {
            status_code: response.status,
            body: response.body_text(),
        }))
    }
}

/// Terminal error for a 401 received on the resend
pub(crate) fn auth_failed(response: &HttpResponse) -> DispatchError {
    let body = response.body_text();
    if body.is_empty() {
        DispatchError::AuthFailed(format!("HTTP {} after credential refresh", response.status))
    } else {
        DispatchError::AuthFailed(format!(
            "HTTP {} after credential refresh: {body}",
            response.status
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        for status in [200, 201, 204, 299] {
            let classification = classify(HttpResponse::new(status, ""));
            assert!(matches!(classification, Classification::Final(Ok(Outcome::Success(_)))));
        }
    }

    #[test]
    fn test_not_found_is_absent() {
        let classification = classify(HttpResponse::new(404, r#"[{"errorCode":"NOT_FOUND"}]"#));
        match classification {
            Classification::Final(Ok(Outcome::Absent(response))) => assert_eq!(response.status, 404),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_requests_refresh() {
        assert!(matches!(
            classify(HttpResponse::new(401, "")),
            Classification::AuthInvalid(_)
        ));
    }

    #[test]
    fn test_forbidden_is_a_server_error() {
        match classify(HttpResponse::new(403, "forbidden")) {
            Classification::Final(Err(DispatchError::ServerError { status_code, body })) => {
                assert_eq!(status_code, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_server_failures_carry_status() {
        for status in [400, 409, 500, 503] {
            let classification = classify(HttpResponse::new(status, ""));
            assert!(matches!(
                classification,
                Classification::Final(Err(DispatchError::ServerError { status_code, .. }))
                    if status_code == status
            ));
        }
    }

    #[test]
    fn test_auth_failed_message() {
        let err = auth_failed(&HttpResponse::new(401, "Session expired or invalid"));
        assert_eq!(
            err,
            DispatchError::AuthFailed(
                "HTTP 401 after credential refresh: Session expired or invalid".into()
            )
        );
        assert!(err.needs_reauthentication());
    }
}
