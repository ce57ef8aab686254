//! Работа с текстом сценария

/// Сколько слов сценария входит в один поисковый запрос
pub const DEFAULT_WORDS_PER_TERM: usize = 5;

/// Разбить сценарий на поисковые запросы по `words_per_term` слов.
///
/// Последний запрос содержит оставшиеся слова. Один запрос соответствует
/// одному изображению ролика.
pub fn search_terms(script: &str, words_per_term: usize) -> Vec<String> {
    let words: Vec<&str> = script.split_whitespace().collect();
    words
        .chunks(words_per_term.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}
