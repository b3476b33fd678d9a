use axum::{Json, extract::rejection::JsonRejection};
use sheet::PollOption;

use crate::error::AppError::{self, MalformedPayload};

pub fn get_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| MalformedPayload(rejection.body_text()))
}

pub fn get_option(code: &str) -> Result<PollOption, AppError> {
    code.parse().map_err(|e| MalformedPayload(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_options() {
        assert_eq!(get_option("A").unwrap(), PollOption::A);
        assert_eq!(get_option("b").unwrap(), PollOption::B);
    }

    #[test]
    fn test_unknown_option_is_malformed() {
        assert!(matches!(get_option("C"), Err(MalformedPayload(_))));
        assert!(matches!(get_option(""), Err(MalformedPayload(_))));
    }
}
