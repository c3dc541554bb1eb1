/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "browse",
    aliases: &["b", "home"],
    description: "Popular movies with search and genre filters",
  },
  Command {
    name: "popular",
    aliases: &["p", "pop"],
    description: "Popular movies",
  },
  Command {
    name: "now",
    aliases: &["n", "playing", "cinema"],
    description: "Now playing in your region",
  },
  Command {
    name: "upcoming",
    aliases: &["u", "soon"],
    description: "Upcoming releases",
  },
  Command {
    name: "top",
    aliases: &["t", "toprated", "best"],
    description: "Top rated of all time",
  },
  Command {
    name: "trending",
    aliases: &["tr", "today"],
    description: "Trending today",
  },
  Command {
    name: "week",
    aliases: &["w", "weekly"],
    description: "Trending this week",
  },
  Command {
    name: "discover",
    aliases: &["d", "recent", "new"],
    description: "Recent releases from the last 90 days",
  },
  Command {
    name: "genres",
    aliases: &["g", "genre"],
    description: "Browse by genre",
  },
  Command {
    name: "search",
    aliases: &["s", "find"],
    description: "Search movies",
  },
  Command {
    name: "favorites",
    aliases: &["f", "fav", "favs"],
    description: "Your favorite movies",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit marquee",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable, so ties keep declaration order
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match.
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else if is_subsequence(input, cmd.name) {
    Some(6)
  } else {
    None
  }
}

/// Whether every char of `needle` appears in `haystack` in order.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
  let mut rest = haystack.chars();
  needle.chars().all(|c| rest.any(|h| h == c))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("upcoming");
    assert_eq!(suggestions[0].name, "upcoming");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "t" is an alias of top and a prefix of trending
    let suggestions = get_suggestions("t");
    assert_eq!(suggestions[0].name, "top");
    assert!(suggestions.iter().any(|c| c.name == "trending"));
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("fav");
    assert_eq!(suggestions[0].name, "favorites");

    let suggestions = get_suggestions("gen");
    assert_eq!(suggestions[0].name, "genres");
  }

  #[test]
  fn test_contains_match() {
    let suggestions = get_suggestions("com");
    assert_eq!(suggestions[0].name, "upcoming");
  }

  #[test]
  fn test_subsequence_match() {
    let suggestions = get_suggestions("fvrt");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].name, "favorites");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
