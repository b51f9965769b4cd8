//! Command palette entries and autocomplete.

use crate::api::ResourceKind;

/// What a palette command does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  /// Replace the root view with the list of a resource
  Open(ResourceKind),
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: Action,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "courses",
    aliases: &["c", "course"],
    description: "Course catalogue",
    action: Action::Open(ResourceKind::Courses),
  },
  Command {
    name: "lectures",
    aliases: &["l", "lecture"],
    description: "Lectures",
    action: Action::Open(ResourceKind::Lectures),
  },
  Command {
    name: "assignments",
    aliases: &["a", "assignment"],
    description: "Assignments",
    action: Action::Open(ResourceKind::Assignments),
  },
  Command {
    name: "materials",
    aliases: &["m", "assignment-materials"],
    description: "Assignment materials",
    action: Action::Open(ResourceKind::AssignmentMaterials),
  },
  Command {
    name: "submissions",
    aliases: &["sub", "assignment-submissions"],
    description: "Assignment submissions",
    action: Action::Open(ResourceKind::AssignmentSubmissions),
  },
  Command {
    name: "quizzes",
    aliases: &["qz", "quiz"],
    description: "Quizzes",
    action: Action::Open(ResourceKind::Quizzes),
  },
  Command {
    name: "questions",
    aliases: &["qq", "quiz-questions"],
    description: "Quiz questions",
    action: Action::Open(ResourceKind::QuizQuestions),
  },
  Command {
    name: "grades",
    aliases: &["g", "grade"],
    description: "Grades",
    action: Action::Open(ResourceKind::Grades),
  },
  Command {
    name: "tests",
    aliases: &["t", "test"],
    description: "Test records",
    action: Action::Open(ResourceKind::Tests),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit courseterm",
    action: Action::Quit,
  },
];

/// A submitted palette line: the command plus the rest of the line, which
/// list commands take as a filter (`:grades students=7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub action: Action,
  pub argument: String,
}

/// Resolve a submitted line. The first word may be a name, an alias or a
/// prefix of either; the best suggestion wins.
pub fn parse(line: &str) -> Option<Invocation> {
  let line = line.trim();
  let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
  if word.is_empty() {
    return None;
  }
  let command = get_suggestions(word).into_iter().next()?;
  Some(Invocation {
    action: command.action,
    argument: rest.trim().to_string(),
  })
}

/// Get autocomplete suggestions for the first word of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let word = input.split_whitespace().next().unwrap_or("");
  let input_lower = word.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
