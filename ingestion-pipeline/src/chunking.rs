use common::{error::AppError, ids, tokenizer::get_tokenizer};

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub token_count: usize,
}

/// Token-window chunking with overlap. `target` and `overlap` are in
/// tokens; `pos` advances by `target - overlap` each step, and the last
/// window covers the tail exactly (§4.3).
pub fn chunk_text(
    text: &str,
    artifact_id: &str,
    target: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, AppError> {
    if overlap >= target {
        return Err(AppError::Validation(
            "chunk overlap must be smaller than the chunk target".into(),
        ));
    }

    let tokenizer = get_tokenizer()?;
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| AppError::InternalError(format!("tokenizer encode failed: {e}")))?;
    let offsets = encoding.get_offsets();
    let total = offsets.len();

    if total == 0 {
        return Ok(Vec::new());
    }

    let step = target - overlap;
    let mut chunks = Vec::new();
    let mut pos = 0usize;
    let mut index = 0usize;

    loop {
        let window_len = target.min(total - pos);
        let end = pos + window_len;
        let start_char = offsets[pos].0;
        let end_char = offsets[end - 1].1;
        let content = text[start_char..end_char].to_string();
        let chunk_id = ids::chunk_id(artifact_id, index, &content);

        chunks.push(Chunk {
            chunk_id,
            content,
            chunk_index: index,
            start_char,
            end_char,
            token_count: window_len,
        });

        if end >= total {
            break;
        }
        pos += step;
        index += 1;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_short_text_is_one_chunk() {
        let chunks = chunk_text("hello world, this is a short note.", "art_abc", 900, 100)
            .expect("chunking should succeed");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].start_char, 0);
    }

    #[test]
    fn rejects_overlap_ge_target() {
        let err = chunk_text("text", "art_abc", 100, 100).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn chunk_ids_are_deterministic() {
        let text = "word ".repeat(2000);
        let a = chunk_text(&text, "art_abc", 900, 100).expect("chunking should succeed");
        let b = chunk_text(&text, "art_abc", 900, 100).expect("chunking should succeed");
        assert_eq!(a, b);
        assert!(a.len() > 1);
    }

    #[test]
    fn chunks_cover_text_without_gaps() {
        let text = "word ".repeat(2000);
        let chunks = chunk_text(&text, "art_abc", 900, 100).expect("chunking should succeed");
        for window in chunks.windows(2) {
            assert!(window[1].start_char < window[0].end_char);
        }
        assert_eq!(chunks.last().unwrap().end_char, text.len());
    }
}
