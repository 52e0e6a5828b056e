use url::Url;

use crate::errors::{Result, ShortenerError};

/// 短码最大长度
pub const MAX_SHORT_CODE_LENGTH: usize = 64;

/// 短码只允许字母、数字、`-` 和 `_`
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SHORT_CODE_LENGTH
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// 校验原始 URL：必须能解析、带主机名，且只允许 http / https
pub fn validate_original_url(raw: &str) -> Result<()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ShortenerError::validation("URL cannot be empty"));
    }

    let url = Url::parse(raw)
        .map_err(|e| ShortenerError::validation(format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ShortenerError::validation(format!(
                "Protocol '{}:' is not allowed, only http:// and https://",
                other
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ShortenerError::validation("URL must contain a host"));
    }

    Ok(())
}
