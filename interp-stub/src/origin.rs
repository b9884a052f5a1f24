/// Placeholder naming the directory of the executable being launched,
/// resolved at launch time so installs stay relocatable.
pub const ORIGIN: &str = "$ORIGIN";

/// Braced spelling accepted by the glibc loader.
pub const ORIGIN_BRACED: &str = "${ORIGIN}";

/// Expands every placeholder occurrence in `hint` to `origin`.
///
/// Both spellings are replaced in one simultaneous pass, so an `origin`
/// whose own text happens to contain the token is not expanded again. An
/// absent hint expands to the empty string.
pub fn expand(hint: Option<&str>, origin: &str) -> String {
    match hint {
        Some(hint) => hint.replace(ORIGIN_BRACED, origin).replace(ORIGIN, origin),
        None => String::new(),
    }
}

/// True when the raw hint asks for launch-time expansion at all.
pub fn mentions_origin(hint: Option<&str>) -> bool {
    hint.map_or(false, |hint| hint.contains(ORIGIN) || hint.contains(ORIGIN_BRACED))
}
