//! One-shot subcommands for scripting: the same client and cache as the
//! TUI, printed as plain text.

use clap::Subcommand;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::api::params::{Filter, SortSpec};
use crate::api::resource::with_resource;
use crate::api::{ApiError, CachedClient, ListParams, Resource, ResourceKind};
use crate::cache::{DeleteOutcome, Entity, ItemId};
use crate::display::{format_header, format_row, Tabular};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print one page of a resource, or every page with --all
  List {
    resource: ResourceKind,
    /// Sort as `field[:asc|desc]`
    #[arg(long)]
    sort: Option<String>,
    /// Relation filter as `relation=id,id`
    #[arg(long, default_value = "")]
    filter: String,
    #[arg(long)]
    all: bool,
  },
  /// Print one item
  Show { resource: ResourceKind, id: String },
  /// Create an item from a JSON body
  Create {
    resource: ResourceKind,
    #[arg(long)]
    data: String,
  },
  /// Update fields of an item from a JSON body
  Update {
    resource: ResourceKind,
    id: String,
    #[arg(long)]
    data: String,
  },
  /// Delete an item, asking first unless --yes
  Delete {
    resource: ResourceKind,
    id: String,
    #[arg(long)]
    yes: bool,
  },
  /// Enroll a student in a course
  Enroll {
    #[arg(long)]
    student: String,
    #[arg(long)]
    course: String,
  },
  /// Ask the AI service how likely a text is machine-written. Reads stdin
  /// unless --text or --file is given.
  Predict {
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
  },
}

pub async fn run(command: Command, client: &CachedClient) -> Result<()> {
  info!(?command, "running command");
  match command {
    Command::List {
      resource,
      sort,
      filter,
      all,
    } => with_resource!(resource, R => list::<R>(client, sort.as_deref(), &filter, all).await),
    Command::Show { resource, id } => {
      with_resource!(resource, R => show::<R>(client, &ItemId::parse(&id)).await)
    }
    Command::Create { resource, data } => {
      with_resource!(resource, R => create::<R>(client, &data).await)
    }
    Command::Update { resource, id, data } => {
      with_resource!(resource, R => update::<R>(client, &ItemId::parse(&id), &data).await)
    }
    Command::Delete { resource, id, yes } => {
      with_resource!(resource, R => delete::<R>(client, &ItemId::parse(&id), yes).await)
    }
    Command::Enroll { student, course } => {
      let enrollment = client
        .enroll(&ItemId::from(student.as_str()), &ItemId::from(course.as_str()))
        .await?;
      println!("Enrolled student {} in course {} (enrollment {})", student, course, enrollment.id);
      Ok(())
    }
    Command::Predict { text, file } => {
      let text = predict_input(text, file).await?;
      let prediction = client.predict(&text).await?;
      println!("{}", prediction);
      Ok(())
    }
  }
}

/// Text to send for a prediction, from the flag, the file or stdin.
async fn predict_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
  let text = match (text, file) {
    (Some(text), _) => text,
    (None, Some(path)) => tokio::fs::read_to_string(&path)
      .await
      .wrap_err_with(|| format!("Failed to read {}", path.display()))?,
    (None, None) => {
      let mut text = String::new();
      tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .wrap_err("Failed to read stdin")?;
      text
    }
  };
  if text.trim().is_empty() {
    return Err(eyre!("Nothing to check: the text is empty"));
  }
  Ok(text)
}

async fn list<R>(client: &CachedClient, sort: Option<&str>, filter: &str, all: bool) -> Result<()>
where
  R: Resource,
  R::Item: Tabular,
{
  let sort = sort
    .map(SortSpec::<R::SortField>::parse)
    .transpose()?;
  let filter = R::Filter::parse(filter)?;
  let params = ListParams::<R>::new(sort, filter);

  let _subscription = client.subscribe(&params);
  client.fetch_next_page(&params).await?;
  while all && client.has_next_page(&params) {
    client.fetch_next_page(&params).await?;
  }

  let items = client.items(&params);
  let pages = client.store().get_pages::<R::Item>(&params.key()).len();
  print!("{}", render_table::<R::Item>(&items));
  println!("({} items in {} pages)", items.len(), pages);
  if !all && client.has_next_page(&params) {
    println!("(more items available, use --all)");
  }
  Ok(())
}

async fn show<R>(client: &CachedClient, id: &ItemId) -> Result<()>
where
  R: Resource,
  R::Item: Tabular,
{
  let item = client.get::<R>(id).await?;
  print!("{}", render_item(&item));
  Ok(())
}

async fn create<R>(client: &CachedClient, data: &str) -> Result<()>
where
  R: Resource,
  R::Item: Tabular,
{
  let input = parse_input::<R>(data)?;
  let item = client.create::<R>(&input).await.map_err(write_error)?;
  println!("Created {} {}", R::LABEL.to_lowercase(), item.id());
  Ok(())
}

async fn update<R>(client: &CachedClient, id: &ItemId, data: &str) -> Result<()>
where
  R: Resource,
  R::Item: Tabular,
{
  let input = parse_input::<R>(data)?;
  let item = client.update::<R>(id, &input).await.map_err(write_error)?;
  print!("{}", render_item(&item));
  Ok(())
}

async fn delete<R: Resource>(client: &CachedClient, id: &ItemId, yes: bool) -> Result<()> {
  let params = ListParams::<R>::default();
  let prompt = format!("Delete {} {}? [y/N] ", R::LABEL.to_lowercase(), id);
  let outcome = client
    .delete(&params, id, || async move { yes || ask(prompt).await })
    .await?;
  match outcome {
    DeleteOutcome::Deleted => println!("Deleted {} {}", R::LABEL.to_lowercase(), id),
    DeleteOutcome::Declined => println!("Cancelled"),
  }
  Ok(())
}

/// Read a yes/no answer from stdin without blocking the runtime.
async fn ask(prompt: String) -> bool {
  let answer = tokio::task::spawn_blocking(move || {
    print!("{}", prompt);
    std::io::stdout().flush().ok()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok()?;
    Some(line)
  })
  .await;
  matches!(answer, Ok(Some(line)) if is_yes(&line))
}

fn is_yes(line: &str) -> bool {
  matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

fn parse_input<R: Resource>(data: &str) -> Result<R::Input> {
  serde_json::from_str(data).wrap_err_with(|| format!("Invalid {} body", R::LABEL.to_lowercase()))
}

/// Print the per-field codes of a rejected write before it is reported.
fn write_error(err: ApiError) -> color_eyre::Report {
  for line in validation_lines(&err) {
    eprintln!("{}", line);
  }
  err.into()
}

fn validation_lines(err: &ApiError) -> Vec<String> {
  match err {
    ApiError::Validation { errors, .. } => errors
      .fields
      .iter()
      .map(|(field, code)| format!("  {}: {}", field, code))
      .collect(),
    _ => Vec::new(),
  }
}

fn render_table<T: Tabular>(items: &[T]) -> String {
  let mut out = format_header::<T>();
  out.push('\n');
  for item in items {
    out.push_str(&format_row::<T>(&item.cells()));
    out.push('\n');
  }
  out
}

fn render_item<T: Tabular>(item: &T) -> String {
  let mut out = format!("{}\n\n", item.title());
  let width = item
    .fields()
    .iter()
    .map(|(name, _)| name.len())
    .max()
    .unwrap_or(0);
  for (name, value) in item.fields() {
    out.push_str(&format!("{:<width$}  {}\n", name, value, width = width));
  }
  if let Some(body) = item.body() {
    out.push('\n');
    out.push_str(body);
    out.push('\n');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ValidationErrors;
  use crate::api::types::Course;
  use clap::Parser;
  use serde_json::json;

  #[derive(Parser, Debug)]
  struct TestCli {
    #[command(subcommand)]
    command: Command,
  }

  #[test]
  fn test_parse_list_arguments() {
    let cli = TestCli::try_parse_from([
      "courseterm",
      "list",
      "quiz-questions",
      "--sort",
      "id:asc",
      "--filter",
      "quizzes=5",
      "--all",
    ])
    .unwrap();
    match cli.command {
      Command::List {
        resource,
        sort,
        filter,
        all,
      } => {
        assert_eq!(resource, ResourceKind::QuizQuestions);
        assert_eq!(sort.as_deref(), Some("id:asc"));
        assert_eq!(filter, "quizzes=5");
        assert!(all);
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_unknown_resource_is_rejected() {
    assert!(TestCli::try_parse_from(["courseterm", "show", "teachers", "1"]).is_err());
  }

  #[test]
  fn test_render_table_has_header_and_rows() {
    let courses: Vec<Course> = serde_json::from_value(json!([
      { "id": "1", "courseName": "Rust" },
      { "id": "2", "courseName": "Go" },
    ]))
    .unwrap();
    let table = render_table(&courses);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format_header::<Course>());
    assert!(lines[1].contains("Rust"));
  }

  #[test]
  fn test_validation_errors_one_line_per_field() {
    let err = ApiError::Validation {
      resource: "courses",
      errors: ValidationErrors::from_body(
        br#"{"errors":{"courseName":"required","coursePrice":"min"}}"#,
      ),
    };
    assert_eq!(
      validation_lines(&err),
      vec!["  courseName: required".to_string(), "  coursePrice: min".to_string()]
    );
  }

  #[test]
  fn test_body_with_unknown_field_is_rejected() {
    use crate::api::resource::Courses;
    assert!(parse_input::<Courses>(r#"{"courseName":"Rust"}"#).is_ok());
    assert!(parse_input::<Courses>(r#"{"nope":1}"#).is_err());
  }

  #[test]
  fn test_predict_text_and_file_conflict() {
    let cli = TestCli::try_parse_from(["courseterm", "predict", "--text", "essay"]).unwrap();
    assert!(matches!(cli.command, Command::Predict { text: Some(_), file: None }));
    assert!(TestCli::try_parse_from([
      "courseterm",
      "predict",
      "--text",
      "essay",
      "--file",
      "essay.txt"
    ])
    .is_err());
  }

  #[tokio::test]
  async fn test_predict_input_rejects_blank_text() {
    assert_eq!(
      predict_input(Some("essay".to_string()), None).await.unwrap(),
      "essay"
    );
    assert!(predict_input(Some("  \n".to_string()), None).await.is_err());
    assert!(predict_input(None, Some(PathBuf::from("/nonexistent/essay.txt")))
      .await
      .is_err());
  }

  #[test]
  fn test_is_yes() {
    assert!(is_yes("y\n"));
    assert!(is_yes(" YES "));
    assert!(!is_yes("\n"));
    assert!(!is_yes("no"));
  }
}
