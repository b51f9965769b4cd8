//! How each record is laid out as a table row and as a detail page.
//! Shared by the list views and the CLI.

use crate::api::types::{
  Assignment, AssignmentMaterial, AssignmentSubmission, Course, Grade, Lecture, Quiz, QuizQuestion,
  TestRecord, User,
};
use crate::ui::renderfns::{format_date, truncate};

/// A table column: header and width in characters.
#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub header: &'static str,
  pub width: usize,
}

const fn col(header: &'static str, width: usize) -> Column {
  Column { header, width }
}

pub trait Tabular {
  const COLUMNS: &'static [Column];

  /// One cell per column, untruncated
  fn cells(&self) -> Vec<String>;

  /// Short name for titles and confirmations
  fn title(&self) -> String;

  /// Labelled fields of the detail page
  fn fields(&self) -> Vec<(&'static str, String)>;

  /// Long free text shown under the fields
  fn body(&self) -> Option<&str> {
    None
  }

  /// Status text, colored in lists
  fn status(&self) -> Option<&str> {
    None
  }
}

/// Render cells into fixed-width columns.
pub fn format_row<T: Tabular>(cells: &[String]) -> String {
  T::COLUMNS
    .iter()
    .zip(cells)
    .map(|(column, cell)| format!("{:<width$}", truncate(cell, column.width), width = column.width))
    .collect::<Vec<_>>()
    .join(" ")
    .trim_end()
    .to_string()
}

pub fn format_header<T: Tabular>() -> String {
  let headers: Vec<String> = T::COLUMNS.iter().map(|c| c.header.to_string()).collect();
  format_row::<T>(&headers)
}

fn opt(value: Option<&str>) -> String {
  value.unwrap_or("").to_string()
}

fn num(value: Option<f64>) -> String {
  value.map(|v| format!("{}", v)).unwrap_or_default()
}

fn user(value: Option<&User>) -> String {
  value.map(User::display_name).unwrap_or_default()
}

fn course_name(course: Option<&Course>) -> String {
  course
    .map(|c| c.course_name.clone().unwrap_or_else(|| c.id.to_string()))
    .unwrap_or_default()
}

fn assignment_name(assignment: Option<&Assignment>) -> String {
  assignment
    .map(|a| a.name.clone().unwrap_or_else(|| a.id.to_string()))
    .unwrap_or_default()
}

impl Tabular for Course {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("NAME", 32),
    col("CATEGORY", 16),
    col("PRICE", 8),
    col("CREATOR", 20),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(self.course_name.as_deref()),
      opt(self.category_type.as_deref()),
      num(self.course_price),
      user(self.course_creator.as_ref()),
    ]
  }

  fn title(&self) -> String {
    self
      .course_name
      .clone()
      .unwrap_or_else(|| self.id.to_string())
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Name", opt(self.course_name.as_deref())),
      ("Category", opt(self.category_type.as_deref())),
      ("Price", num(self.course_price)),
      ("Creator", user(self.course_creator.as_ref())),
      ("Lectures", self.course_lecture.len().to_string()),
    ]
  }
}

impl Tabular for Lecture {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("NAME", 32),
    col("DATE", 10),
    col("TIME", 8),
    col("COURSE", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.lecture_name.clone(),
      format_date(self.lecture_date.as_ref()),
      opt(self.lecture_time.as_deref()),
      course_name(self.course.as_deref()),
    ]
  }

  fn title(&self) -> String {
    if self.lecture_name.is_empty() {
      self.id.to_string()
    } else {
      self.lecture_name.clone()
    }
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Name", self.lecture_name.clone()),
      ("Date", format_date(self.lecture_date.as_ref())),
      ("Time", opt(self.lecture_time.as_deref())),
      ("Course", course_name(self.course.as_deref())),
      ("Previous", opt(self.previous_lecture.as_deref())),
      ("Next", opt(self.next_lecture.as_deref())),
      ("Created", format_date(self.created_at.as_ref())),
      ("Updated", format_date(self.updated_at.as_ref())),
    ]
  }

  fn body(&self) -> Option<&str> {
    self.markdown_content.as_deref()
  }
}

impl Tabular for Assignment {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("NAME", 32),
    col("DEADLINE", 10),
    col("STATUS", 12),
    col("COURSE", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(self.name.as_deref()),
      format_date(self.deadline.as_ref()),
      opt(self.status.as_deref()),
      course_name(self.course.as_deref()),
    ]
  }

  fn title(&self) -> String {
    self.name.clone().unwrap_or_else(|| self.id.to_string())
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Name", opt(self.name.as_deref())),
      ("Deadline", format_date(self.deadline.as_ref())),
      ("Status", opt(self.status.as_deref())),
      ("Course", course_name(self.course.as_deref())),
    ]
  }

  fn body(&self) -> Option<&str> {
    self.description.as_deref()
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }
}

impl Tabular for AssignmentMaterial {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("NAME", 32),
    col("FILE", 32),
    col("ASSIGNMENT", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.name.clone(),
      self
        .file
        .as_ref()
        .and_then(|f| f.path.clone())
        .unwrap_or_default(),
      assignment_name(self.assignment.as_deref()),
    ]
  }

  fn title(&self) -> String {
    if self.name.is_empty() {
      self.id.to_string()
    } else {
      self.name.clone()
    }
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    let cells = self.cells();
    vec![
      ("ID", cells[0].clone()),
      ("Name", cells[1].clone()),
      ("File", cells[2].clone()),
      ("Assignment", cells[3].clone()),
    ]
  }

  fn body(&self) -> Option<&str> {
    self.description.as_deref()
  }
}

impl Tabular for AssignmentSubmission {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("STUDENT", 20),
    col("STATUS", 12),
    col("SUBMITTED", 10),
    col("ASSIGNMENT", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      user(self.student.as_ref()),
      opt(self.status.as_deref()),
      format_date(self.created_at.as_ref()),
      assignment_name(self.assignment.as_deref()),
    ]
  }

  fn title(&self) -> String {
    format!("Submission {}", self.id)
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    let cells = self.cells();
    vec![
      ("ID", cells[0].clone()),
      ("Student", cells[1].clone()),
      ("Status", cells[2].clone()),
      ("Submitted", cells[3].clone()),
      ("Assignment", cells[4].clone()),
      (
        "File",
        self
          .file
          .as_ref()
          .and_then(|f| f.path.clone())
          .unwrap_or_default(),
      ),
    ]
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }
}

impl Tabular for Quiz {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("TITLE", 40),
    col("TAKEN", 5),
    col("COURSE", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(self.title.as_deref()),
      match self.is_taken {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => String::new(),
      },
      course_name(self.course.as_deref()),
    ]
  }

  fn title(&self) -> String {
    self.title.clone().unwrap_or_else(|| self.id.to_string())
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    let cells = self.cells();
    vec![
      ("ID", cells[0].clone()),
      ("Title", cells[1].clone()),
      ("Taken", cells[2].clone()),
      ("Course", cells[3].clone()),
    ]
  }
}

impl Tabular for QuizQuestion {
  const COLUMNS: &'static [Column] = &[
    col("ID", 6),
    col("QUESTION", 48),
    col("OPTIONS", 7),
    col("QUIZ", 24),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(self.question_text.as_deref()),
      self.options.len().to_string(),
      opt(self.quiz_id.as_deref()),
    ]
  }

  fn title(&self) -> String {
    self
      .question_text
      .as_deref()
      .map(|t| truncate(t, 40))
      .unwrap_or_else(|| format!("Question {}", self.id))
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Question", opt(self.question_text.as_deref())),
      ("Options", self.options.join(" | ")),
      ("Answer", opt(self.answer.as_deref())),
      ("Quiz", opt(self.quiz_id.as_deref())),
    ]
  }
}

impl Tabular for Grade {
  const COLUMNS: &'static [Column] = &[
    col("ID", 24),
    col("NAME", 24),
    col("GRADE", 8),
    col("MAX", 8),
    col("STUDENT", 20),
    col("UPDATED", 10),
  ];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(self.name.as_deref()),
      num(self.grade),
      num(self.max_grade),
      user(self.student.as_ref()),
      format_date(self.updated_at.as_ref()),
    ]
  }

  fn title(&self) -> String {
    self.name.clone().unwrap_or_else(|| self.id.to_string())
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Name", opt(self.name.as_deref())),
      ("Grade", num(self.grade)),
      ("Max grade", num(self.max_grade)),
      ("Student", user(self.student.as_ref())),
      ("Course", course_name(self.course.as_deref())),
      ("Assignment", assignment_name(self.assignment.as_deref())),
      (
        "Quiz",
        self
          .quiz
          .as_ref()
          .and_then(|q| q.title.clone())
          .unwrap_or_default(),
      ),
      ("Created", format_date(self.created_at.as_ref())),
      ("Updated", format_date(self.updated_at.as_ref())),
    ]
  }

  fn body(&self) -> Option<&str> {
    self.feedback.as_deref()
  }
}

impl Tabular for TestRecord {
  const COLUMNS: &'static [Column] = &[col("ID", 24), col("DESCRIPTION", 56)];

  fn cells(&self) -> Vec<String> {
    vec![self.id.to_string(), opt(self.description.as_deref())]
  }

  fn title(&self) -> String {
    format!("Test {}", self.id)
  }

  fn fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", self.id.to_string()),
      ("Description", opt(self.description.as_deref())),
      ("Created", format_date(self.created_at.as_ref())),
    ]
  }
}
