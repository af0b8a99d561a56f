//! Recursive character splitting: try the coarsest separator first, fall
//! back to finer ones only for pieces still over `chunk_size`, then merge
//! adjacent small pieces back up to `chunk_size` with `chunk_overlap` carried
//! from the tail of the previous piece into the next.

pub fn recursive_split(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[String],
) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    split(text, separators, chunk_size, chunk_overlap)
}

fn split(text: &str, separators: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let (separator, remaining) = pick_separator(text, separators);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.split("").filter(|s| !s.is_empty()).collect()
    } else {
        text.split(separator.as_str()).collect()
    };

    let mut good: Vec<String> = Vec::new();
    let mut chunks: Vec<String> = Vec::new();

    for piece in pieces {
        if piece.chars().count() < chunk_size {
            good.push(piece.to_string());
        } else {
            if !good.is_empty() {
                chunks.extend(merge(&good, &separator, chunk_size, chunk_overlap));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(split(piece, remaining, chunk_size, chunk_overlap));
            }
        }
    }

    if !good.is_empty() {
        chunks.extend(merge(&good, &separator, chunk_size, chunk_overlap));
    }

    chunks
}

/// First separator that actually occurs in `text` wins; the rest become the
/// fallback list used if pieces split by it are still oversized. An empty
/// separator (character split) always matches and is the final fallback.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (String, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep.clone(), &separators[i + 1..]);
        }
    }
    (String::new(), &[])
}

fn merge(pieces: &[String], separator: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for piece in pieces {
        let piece_len = piece.chars().count();
        let added_len = if current.is_empty() {
            piece_len
        } else {
            piece_len + separator.chars().count()
        };

        if current_len + added_len > chunk_size && !current.is_empty() {
            chunks.push(current.join(separator));
            current = carry_overlap(&current, separator, chunk_overlap);
            current_len = current.iter().map(|s| s.chars().count()).sum::<usize>()
                + separator.chars().count().saturating_mul(current.len().saturating_sub(1));
        }

        current.push(piece.as_str());
        current_len += added_len;
    }

    if !current.is_empty() {
        chunks.push(current.join(separator));
    }

    chunks
}

fn carry_overlap<'a>(current: &[&'a str], separator: &str, chunk_overlap: usize) -> Vec<&'a str> {
    if chunk_overlap == 0 {
        return Vec::new();
    }
    let mut carried = Vec::new();
    let mut total = 0usize;
    for piece in current.iter().rev() {
        let added = piece.chars().count() + separator.chars().count();
        if total + added > chunk_overlap && !carried.is_empty() {
            break;
        }
        carried.push(*piece);
        total += added;
    }
    carried.reverse();
    carried
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_separators() -> Vec<String> {
        vec![
            "\n\n".to_string(),
            "\n".to_string(),
            ". ".to_string(),
            ", ".to_string(),
            " ".to_string(),
            String::new(),
        ]
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = recursive_split("hello world", 1000, 100, &default_separators());
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn splits_on_paragraph_boundary_when_oversized() {
        let text = format!("{}\n\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = recursive_split(&text, 60, 0, &default_separators());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn no_chunk_exceeds_size_for_long_unbroken_text() {
        let text = "word ".repeat(500);
        let chunks = recursive_split(&text, 100, 20, &default_separators());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 150, "chunk too large: {}", chunk.len());
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(recursive_split("", 100, 10, &default_separators()).is_empty());
    }
}
