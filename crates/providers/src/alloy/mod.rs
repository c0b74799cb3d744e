//! The [`alloy`](https://github.com/alloy-rs/alloy) backed implementations of the chain
//! collaborators. This is the only place where JSON-RPC error shapes are interpreted.

mod chain;
pub use chain::AlloyChainClient;

mod contract;
pub use contract::AlloyMessageServiceClient;

mod sender;
pub use sender::AlloyTransactionSender;

use crate::{ProviderError, RevertReason};
use std::{future::IntoFuture, time::Duration};

use alloy_json_rpc::{ErrorPayload, RpcError};
use alloy_transport::{TransportError, TransportErrorKind, TransportResult};
use postman_abi::ContractRevert;

/// Awaits the request, failing with [`ProviderError::Timeout`] once `timeout` has elapsed.
pub(crate) async fn with_timeout<F, T>(timeout: Duration, request: F) -> Result<T, ProviderError>
where
    F: IntoFuture<Output = TransportResult<T>>,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| ProviderError::Timeout(timeout))?
        .map_err(Into::into)
}

impl From<TransportError> for ProviderError {
    fn from(error: TransportError) -> Self {
        match &error {
            RpcError::ErrorResp(payload) => classify_error_response(payload),
            RpcError::Transport(TransportErrorKind::HttpError(http)) if http.status == 429 => {
                Self::RateLimited
            }
            RpcError::Transport(_) => Self::Transport(error.to_string()),
            RpcError::NullResp | RpcError::SerError(_) | RpcError::DeserError { .. } => {
                Self::InvalidResponse(error.to_string())
            }
            _ => Self::Rejected(error.to_string()),
        }
    }
}

fn classify_error_response(payload: &ErrorPayload) -> ProviderError {
    if let Some(data) = payload.as_revert_data() {
        let reason = match ContractRevert::try_decode(&data) {
            Some(ContractRevert::RateLimitExceeded) => RevertReason::RateLimitExceeded,
            Some(ContractRevert::MessageAlreadyClaimed) => RevertReason::MessageAlreadyClaimed,
            None => RevertReason::Other(data),
        };
        return ProviderError::Reverted(reason);
    }

    let message = payload.message.to_lowercase();
    if payload.code == 429 ||
        message.contains("rate limit") ||
        message.contains("too many requests")
    {
        ProviderError::RateLimited
    } else if message.contains("nonce too low") ||
        message.contains("nonce too high") ||
        message.contains("invalid nonce")
    {
        ProviderError::Nonce(payload.message.to_string())
    } else if message.contains("revert") {
        ProviderError::Reverted(RevertReason::Other(Default::default()))
    } else {
        ProviderError::Rejected(payload.message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use alloy_sol_types::SolError;
    use postman_abi::errors::RateLimitExceeded;
    use std::borrow::Cow;

    fn error_response(code: i64, message: &'static str, data: Option<Bytes>) -> TransportError {
        let data = data.map(|data| {
            serde_json::value::to_raw_value(&data).expect("bytes serialize to json")
        });
        RpcError::ErrorResp(ErrorPayload { code, message: Cow::Borrowed(message), data })
    }

    #[test]
    fn test_revert_data_is_decoded() {
        let data = Bytes::from(RateLimitExceeded {}.abi_encode());
        let error: ProviderError = error_response(3, "execution reverted", Some(data)).into();
        assert_eq!(error, ProviderError::Reverted(RevertReason::RateLimitExceeded));
    }

    #[test]
    fn test_error_messages_are_classified() {
        let error: ProviderError = error_response(-32000, "nonce too low", None).into();
        assert!(matches!(error, ProviderError::Nonce(_)));

        let error: ProviderError = error_response(-32005, "Rate limit exceeded", None).into();
        assert_eq!(error, ProviderError::RateLimited);

        let error: ProviderError =
            error_response(-32000, "replacement transaction underpriced", None).into();
        assert!(error.is_definitive_rejection());

        let error: ProviderError = RpcError::NullResp.into();
        assert!(matches!(error, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let timeout = Duration::from_millis(10);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            TransportResult::Ok(1u64)
        };

        let error = with_timeout(timeout, slow).await.unwrap_err();
        assert_eq!(error, ProviderError::Timeout(timeout));
    }
}
