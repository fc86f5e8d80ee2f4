/// Merge recognizer tokens into one plate string.
///
/// Tokens are concatenated in reading order and every whitespace character
/// is dropped. Case and character set are left untouched, so look-alike
/// confusions such as `O`/`0` pass through as recognized.
pub fn clean_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .flat_map(|token| token.as_ref().chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}
