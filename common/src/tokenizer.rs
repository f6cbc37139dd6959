use std::sync::OnceLock;

use crate::error::AppError;

/// Process-wide tokenizer used for every token-count and chunk-offset
/// computation, so that `SINGLE_PIECE_MAX`/`CHUNK_TARGET`/`CHUNK_OVERLAP`
/// thresholds are evaluated against one fixed vocabulary.
pub fn get_tokenizer() -> Result<&'static tokenizers::Tokenizer, AppError> {
    static TOKENIZER: OnceLock<Result<tokenizers::Tokenizer, String>> = OnceLock::new();

    match TOKENIZER.get_or_init(|| {
        tokenizers::Tokenizer::from_pretrained("bert-base-cased", None)
            .map_err(|e| format!("failed to initialize tokenizer: {e}"))
    }) {
        Ok(tokenizer) => Ok(tokenizer),
        Err(err) => Err(AppError::InternalError(err.clone())),
    }
}

/// Token count of `text` under the fixed tokenizer.
pub fn token_count(text: &str) -> Result<usize, AppError> {
    let tokenizer = get_tokenizer()?;
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| AppError::InternalError(format!("tokenizer encode failed: {e}")))?;
    Ok(encoding.get_ids().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_tokens() {
        let count = token_count("hello world").expect("tokenizer should initialize");
        assert!(count > 0);
    }
}
