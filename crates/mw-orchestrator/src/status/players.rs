//! Parsing of the RCON `list` response
//!
//! Vanilla answers `There are 2 of a max of 20 players online: Steve, Alex`.
//! Some forks put the names on the next line instead (`...online:\nSteve, Alex`).

use mw_core::report::PlayerListing;

/// Parse a `list` response into a player listing
///
/// A response that carries no names (empty tail, unknown shape) maps to
/// [`PlayerListing::Present`] so the caller still reports the count.
pub fn parse_player_list(response: &str) -> PlayerListing {
    let response = strip_formatting(response);
    let tail = response
        .split_once(":\n")
        .or_else(|| response.split_once(": "))
        .map(|(_, tail)| tail)
        .unwrap_or_default();

    let names: Vec<String> = tail
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if names.is_empty() {
        PlayerListing::Present
    } else {
        PlayerListing::Names { names }
    }
}

/// Remove `§x` formatting codes
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(listing: PlayerListing) -> Vec<String> {
        match listing {
            PlayerListing::Names { names } => names,
            other => panic!("Expected names, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_names() {
        let listing = parse_player_list("There are 2 of a max of 20 players online: Steve, Alex");
        assert_eq!(names(listing), vec!["Steve", "Alex"]);
    }

    #[test]
    fn test_names_on_next_line() {
        let listing = parse_player_list("There are 3/20 players online:\nSteve, Alex, Notch\n");
        assert_eq!(names(listing), vec!["Steve", "Alex", "Notch"]);
    }

    #[test]
    fn test_no_names_is_present() {
        assert_eq!(
            parse_player_list("There are 0 of a max of 20 players online: "),
            PlayerListing::Present
        );
        assert_eq!(parse_player_list("Unknown command"), PlayerListing::Present);
    }

    #[test]
    fn test_formatting_codes_removed() {
        let listing = parse_player_list("§6There are §c1§6 players online: §fSteve");
        assert_eq!(names(listing), vec!["Steve"]);
        assert_eq!(strip_formatting("§lbold§r"), "bold");
    }
}
