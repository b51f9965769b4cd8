//! Client-side scoring: quiz attempts, running grade percentages and the
//! verdict on an AI-likelihood prediction.

use std::collections::HashMap;
use std::fmt;

use crate::api::types::{Grade, QuizQuestion};
use crate::cache::ItemId;

/// Verdict shown after a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
  Excellent,
  Good,
  NeedsImprovement,
  Poor,
}

impl Band {
  pub fn from_ratio(ratio: f64) -> Self {
    if ratio >= 0.7 {
      Band::Excellent
    } else if ratio >= 0.5 {
      Band::Good
    } else if ratio >= 0.3 {
      Band::NeedsImprovement
    } else {
      Band::Poor
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Band::Excellent => "Excellent!",
      Band::Good => "Good job!",
      Band::NeedsImprovement => "Needs improvement.",
      Band::Poor => "Poor performance. Try again.",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
  pub correct: usize,
  pub total: usize,
}

impl QuizScore {
  pub fn ratio(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.correct as f64 / self.total as f64
    }
  }

  pub fn band(&self) -> Band {
    Band::from_ratio(self.ratio())
  }
}

impl fmt::Display for QuizScore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Correct answers: {} out of {}. {}",
      self.correct,
      self.total,
      self.band().message()
    )
  }
}

/// How likely the AI service thinks a text was machine-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Likelihood {
  High,
  Medium,
  Low,
  Authentic,
}

impl Likelihood {
  /// Band of a 0-100 score. A score on a bound belongs to the band below.
  pub fn from_score(score: f64) -> Self {
    if score > 70.0 {
      Likelihood::High
    } else if score > 50.0 {
      Likelihood::Medium
    } else if score > 30.0 {
      Likelihood::Low
    } else {
      Likelihood::Authentic
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Likelihood::High => "This looks highly suspicious!",
      Likelihood::Medium => "Medium likelihood of AI involvement.",
      Likelihood::Low => "Low likelihood of AI involvement.",
      Likelihood::Authentic => "Content appears authentic.",
    }
  }
}

/// Score returned by the AI service for one text, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
  pub score: f64,
}

impl Prediction {
  pub fn likelihood(&self) -> Likelihood {
    Likelihood::from_score(self.score)
  }
}

impl fmt::Display for Prediction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Score: {}%. {}", self.score, self.likelihood().message())
  }
}

/// Score chosen options against the questions' answers. A question without
/// an answer key can never be answered correctly.
pub fn score_quiz(questions: &[QuizQuestion], chosen: &HashMap<ItemId, String>) -> QuizScore {
  let correct = questions
    .iter()
    .filter(|q| match (&q.answer, chosen.get(&q.id)) {
      (Some(answer), Some(choice)) => answer == choice,
      _ => false,
    })
    .count();
  QuizScore {
    correct,
    total: questions.len(),
  }
}

/// Sum of grades over sum of max grades, in percent; 0 when nothing is
/// gradable.
pub fn running_percentage(grades: &[Grade]) -> f64 {
  let (total, max) = grades.iter().fold((0.0, 0.0), |(total, max), g| {
    (total + g.grade.unwrap_or(0.0), max + g.max_grade.unwrap_or(0.0))
  });
  if max > 0.0 {
    total / max * 100.0
  } else {
    0.0
  }
}
