use ammonia;

/// Strips unsafe HTML from user-authored text using the ammonia library.
///
/// Applied at write time to assessment titles, question text, option labels
/// and cohort names, so stored content can be rendered by any client without
/// a Stored-XSS risk. Safe inline tags survive; scripts and event handler
/// attributes do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
