use crate::core::{PersistError, Result};
use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const REGEX_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

lazy_static::lazy_static! {
    static ref REGEX_LRU_CACHE: Arc<Mutex<LruCache<String, Arc<Regex>>>> =
        Arc::new(Mutex::new(LruCache::new(REGEX_CACHE_CAPACITY)));
}

#[inline]
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                regex.push_str(&regex::escape(&chars[i].to_string()));
            }
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    regex.push('$');
    regex
}

/// Answers simple patterns without compiling a regex.
#[inline]
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('\\') || pattern.contains('_') {
        return None;
    }

    let fold = |s: &str| {
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };

    let wildcards = pattern.matches('%').count();
    let text = fold(text);

    match wildcards {
        0 => Some(text == fold(pattern)),
        1 if pattern.ends_with('%') => Some(text.starts_with(&fold(&pattern[..pattern.len() - 1]))),
        1 if pattern.starts_with('%') => Some(text.ends_with(&fold(&pattern[1..]))),
        2 if pattern.len() >= 2 && pattern.starts_with('%') && pattern.ends_with('%') => {
            Some(text.contains(&fold(&pattern[1..pattern.len() - 1])))
        }
        _ => None,
    }
}

fn get_or_compile_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let cache_key = if case_sensitive {
        format!("s:{}", pattern)
    } else {
        format!("i:{}", pattern)
    };

    {
        let mut cache = REGEX_LRU_CACHE.lock()?;
        if let Some(regex) = cache.get(&cache_key) {
            return Ok(Arc::clone(regex));
        }
    }

    let compiled = regex::RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| PersistError::Parse(format!("Invalid LIKE pattern: {}", e)))?;
    let compiled = Arc::new(compiled);

    REGEX_LRU_CACHE
        .lock()?
        .put(cache_key, Arc::clone(&compiled));

    Ok(compiled)
}

/// SQL `LIKE` matching with `%`, `_` and `\` escapes.
#[inline]
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }

    let regex = get_or_compile_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}
