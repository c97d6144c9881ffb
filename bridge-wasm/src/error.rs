//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use bridge_traits::media::MediaErrorCode;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors raised by browser audio APIs, classified by `DOMException` name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WasmError {
    /// A required browser API is missing (no `AudioContext`, no `Audio`).
    #[error("Browser API not available: {0}")]
    NotAvailable(String),

    /// `NotAllowedError`: typically autoplay without a user gesture.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// `InvalidStateError`: e.g. resuming a closed context.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// `NotSupportedError` / `AbortError` from media playback.
    #[error("Media error ({code}): {message}")]
    Media {
        /// Classified media failure.
        code: MediaErrorCode,
        /// Browser-provided description.
        message: String,
    },

    /// Any other JavaScript exception.
    #[error("JavaScript error: {0}")]
    JavaScript(String),
}

impl WasmError {
    /// Prefixes the message with what the bridge was doing.
    pub fn context(self, context: &str) -> Self {
        match self {
            WasmError::NotAvailable(m) => WasmError::NotAvailable(format!("{context}: {m}")),
            WasmError::NotAllowed(m) => WasmError::NotAllowed(format!("{context}: {m}")),
            WasmError::InvalidState(m) => WasmError::InvalidState(format!("{context}: {m}")),
            WasmError::Media { code, message } => WasmError::Media {
                code,
                message: format!("{context}: {message}"),
            },
            WasmError::JavaScript(m) => WasmError::JavaScript(format!("{context}: {m}")),
        }
    }
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::NotAvailable(m) => BridgeError::NotAvailable(m),
            WasmError::NotAllowed(m) => BridgeError::NotAllowed(m),
            WasmError::InvalidState(m) => BridgeError::InvalidState(m),
            WasmError::Media { code, message } => BridgeError::Media { code, message },
            WasmError::JavaScript(m) => BridgeError::OperationFailed(m),
        }
    }
}

impl From<JsValue> for WasmError {
    fn from(js_value: JsValue) -> Self {
        if let Some(error) = js_value.dyn_ref::<js_sys::Error>() {
            let name: String = error.name().into();
            let message: String = error.message().into();
            return classify(&name, message);
        }
        let msg = js_value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", js_value));
        WasmError::JavaScript(msg)
    }
}

/// Maps a `DOMException` name to the matching variant.
pub(crate) fn classify(name: &str, message: String) -> WasmError {
    match name {
        "NotAllowedError" => WasmError::NotAllowed(message),
        "InvalidStateError" => WasmError::InvalidState(message),
        "NotSupportedError" => WasmError::Media {
            code: MediaErrorCode::SrcNotSupported,
            message,
        },
        "AbortError" => WasmError::Media {
            code: MediaErrorCode::Aborted,
            message,
        },
        _ => WasmError::JavaScript(format!("{name}: {message}")),
    }
}

/// Converts a thrown `JsValue` into a [`BridgeError`], tagged with `context`.
pub(crate) fn js_error(context: &str, err: JsValue) -> BridgeError {
    WasmError::from(err).context(context).into()
}
