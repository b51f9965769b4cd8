//! Per-collection definitions: wire name, item type, sortable fields,
//! filter relations and write body.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::params::{relation_filter, sort_fields, Filter, NoFilter, SortField, SortSpec};
use super::types::{
  Assignment, AssignmentMaterial, AssignmentSubmission, Course, FileEntity, Grade, Lecture, Quiz,
  QuizQuestion, Ref, TestRecord,
};
use crate::cache::{build_key, Entity, QueryKey};

/// A paginated backend collection.
pub trait Resource: Send + Sync + 'static {
  /// Path segment under `/v1/`, also the root of the cache key
  const NAME: &'static str;
  /// Human label for titles
  const LABEL: &'static str;

  type Item: Entity;
  type SortField: SortField;
  type Filter: Filter;
  /// Body of `POST` and `PATCH`; unset fields are left out
  type Input: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static;
}

/// Sort and filter of one list view.
pub struct ListParams<R: Resource> {
  pub sort: Option<SortSpec<R::SortField>>,
  pub filter: R::Filter,
}

impl<R: Resource> ListParams<R> {
  pub fn new(sort: Option<SortSpec<R::SortField>>, filter: R::Filter) -> Self {
    Self { sort, filter }
  }

  /// Default list params of the views: newest first, no filter.
  pub fn sorted_default() -> Self {
    Self {
      sort: Some(SortSpec::default()),
      filter: R::Filter::default(),
    }
  }

  pub fn key(&self) -> QueryKey {
    build_key(R::NAME, self.sort.as_ref(), Some(&self.filter))
  }

  /// The sort the backend will apply; unsorted lists default to id desc.
  pub fn effective_sort(&self) -> SortSpec<R::SortField> {
    self.sort.unwrap_or_default()
  }
}

impl<R: Resource> Default for ListParams<R> {
  fn default() -> Self {
    Self {
      sort: None,
      filter: R::Filter::default(),
    }
  }
}

impl<R: Resource> Clone for ListParams<R> {
  fn clone(&self) -> Self {
    Self {
      sort: self.sort,
      filter: self.filter.clone(),
    }
  }
}

impl<R: Resource> fmt::Debug for ListParams<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ListParams")
      .field("resource", &R::NAME)
      .field("sort", &self.sort)
      .field("filter", &self.filter)
      .finish()
  }
}

impl<R: Resource> PartialEq for ListParams<R> {
  fn eq(&self, other: &Self) -> bool {
    self.sort == other.sort && self.filter == other.filter
  }
}

macro_rules! resource {
  (
    $(#[$meta:meta])*
    $name:ident {
      name: $wire:literal,
      label: $label:literal,
      item: $item:ty,
      sort: $sort:ty,
      filter: $filter:ty,
      input: $input:ty $(,)?
    }
  ) => {
    $(#[$meta])*
    pub struct $name;

    impl Resource for $name {
      const NAME: &'static str = $wire;
      const LABEL: &'static str = $label;
      type Item = $item;
      type SortField = $sort;
      type Filter = $filter;
      type Input = $input;
    }
  };
}

// ---------------------------------------------------------------------------
// Sort fields. The first variant is the default sort field.
// ---------------------------------------------------------------------------

sort_fields!(CourseSort {
  Id => "id",
  CourseName => "courseName",
  CategoryType => "categoryType",
  CoursePrice => "coursePrice",
});

sort_fields!(LectureSort {
  Id => "id",
  LectureName => "lectureName",
  LectureTime => "lectureTime",
  LectureDate => "lectureDate",
  CreatedAt => "createdAt",
  UpdatedAt => "updatedAt",
});

sort_fields!(AssignmentSort {
  Id => "id",
  Name => "name",
  Deadline => "deadline",
  Status => "status",
});

sort_fields!(MaterialSort {
  Id => "id",
  Name => "name",
});

sort_fields!(SubmissionSort {
  Id => "id",
  Status => "status",
  CreatedAt => "createdAt",
});

sort_fields!(QuizSort {
  Id => "id",
  Title => "title",
});

sort_fields!(QuizQuestionSort {
  Id => "id",
  QuestionText => "questionText",
});

sort_fields!(GradeSort {
  Id => "id",
  Name => "name",
  Grade => "grade",
  MaxGrade => "maxGrade",
  CreatedAt => "createdAt",
  UpdatedAt => "updatedAt",
});

sort_fields!(TestSort {
  Id => "id",
  Description => "description",
});

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

relation_filter!(CourseFilter {
  course_creators => "courseCreators" with "crate::api::params::id_refs",
});

relation_filter!(
  /// Filter of the collections that hang off a course
  ByCourseFilter {
    courses => "courses" with "crate::api::params::id_refs",
  }
);

relation_filter!(GradeFilter {
  students => "students" with "crate::api::params::id_refs",
  courses => "courses" with "crate::api::params::id_refs",
});

relation_filter!(SubmissionFilter {
  assignments => "assignments" with "crate::api::params::id_refs",
  students => "students" with "crate::api::params::id_refs",
});

relation_filter!(MaterialFilter {
  assignments => "assignments" with "crate::api::params::id_refs",
});

relation_filter!(QuizQuestionFilter {
  quizzes => "quizzes" with "crate::api::params::plain_ids",
});

// ---------------------------------------------------------------------------
// Write bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CourseInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_creator: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LectureInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lecture_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lecture_time: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lecture_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub markdown_content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignmentInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaterialInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Already-uploaded file record
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<FileEntity>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmissionInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Ref>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student: Option<Ref>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<FileEntity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuizInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuizQuestionInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quiz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradeInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student: Option<Ref>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Ref>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_grade: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quiz: Option<Ref>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

resource!(Courses {
  name: "courses",
  label: "Courses",
  item: Course,
  sort: CourseSort,
  filter: CourseFilter,
  input: CourseInput,
});

resource!(Lectures {
  name: "lectures",
  label: "Lectures",
  item: Lecture,
  sort: LectureSort,
  filter: ByCourseFilter,
  input: LectureInput,
});

resource!(Assignments {
  name: "assignments",
  label: "Assignments",
  item: Assignment,
  sort: AssignmentSort,
  filter: ByCourseFilter,
  input: AssignmentInput,
});

resource!(AssignmentMaterials {
  name: "assignment-materials",
  label: "Assignment materials",
  item: AssignmentMaterial,
  sort: MaterialSort,
  filter: MaterialFilter,
  input: MaterialInput,
});

resource!(AssignmentSubmissions {
  name: "assignment-submissions",
  label: "Submissions",
  item: AssignmentSubmission,
  sort: SubmissionSort,
  filter: SubmissionFilter,
  input: SubmissionInput,
});

resource!(Quizzes {
  name: "quizzes",
  label: "Quizzes",
  item: Quiz,
  sort: QuizSort,
  filter: ByCourseFilter,
  input: QuizInput,
});

resource!(QuizQuestions {
  name: "quiz-questions",
  label: "Quiz questions",
  item: QuizQuestion,
  sort: QuizQuestionSort,
  filter: QuizQuestionFilter,
  input: QuizQuestionInput,
});

resource!(Grades {
  name: "grades",
  label: "Grades",
  item: Grade,
  sort: GradeSort,
  filter: GradeFilter,
  input: GradeInput,
});

resource!(
  /// Scaffold collection kept for smoke-testing the backend
  Tests {
    name: "tests",
    label: "Tests",
    item: TestRecord,
    sort: TestSort,
    filter: NoFilter,
    input: TestInput,
  }
);

/// Collection picked at runtime, from the command line or the command
/// palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  Courses,
  Lectures,
  Assignments,
  AssignmentMaterials,
  AssignmentSubmissions,
  Quizzes,
  QuizQuestions,
  Grades,
  Tests,
}

impl ResourceKind {
  pub const ALL: &'static [ResourceKind] = &[
    ResourceKind::Courses,
    ResourceKind::Lectures,
    ResourceKind::Assignments,
    ResourceKind::AssignmentMaterials,
    ResourceKind::AssignmentSubmissions,
    ResourceKind::Quizzes,
    ResourceKind::QuizQuestions,
    ResourceKind::Grades,
    ResourceKind::Tests,
  ];

  pub fn name(self) -> &'static str {
    match self {
      ResourceKind::Courses => Courses::NAME,
      ResourceKind::Lectures => Lectures::NAME,
      ResourceKind::Assignments => Assignments::NAME,
      ResourceKind::AssignmentMaterials => AssignmentMaterials::NAME,
      ResourceKind::AssignmentSubmissions => AssignmentSubmissions::NAME,
      ResourceKind::Quizzes => Quizzes::NAME,
      ResourceKind::QuizQuestions => QuizQuestions::NAME,
      ResourceKind::Grades => Grades::NAME,
      ResourceKind::Tests => Tests::NAME,
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ResourceKind {
  type Err = String;

  /// Accepts the wire name, or the name without dashes (`quizquestions`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase().replace(['-', '_'], "");
    ResourceKind::ALL
      .iter()
      .copied()
      .find(|kind| kind.name().replace('-', "") == wanted)
      .ok_or_else(|| {
        let names: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown resource '{}', expected one of: {}", s, names.join(", "))
      })
  }
}

/// Run `$body` with `$r` bound to the [`Resource`] type behind a
/// [`ResourceKind`].
macro_rules! with_resource {
  ($kind:expr, $r:ident => $body:expr) => {{
    use $crate::api::resource as res;
    match $kind {
      res::ResourceKind::Courses => {
        type $r = res::Courses;
        $body
      }
      res::ResourceKind::Lectures => {
        type $r = res::Lectures;
        $body
      }
      res::ResourceKind::Assignments => {
        type $r = res::Assignments;
        $body
      }
      res::ResourceKind::AssignmentMaterials => {
        type $r = res::AssignmentMaterials;
        $body
      }
      res::ResourceKind::AssignmentSubmissions => {
        type $r = res::AssignmentSubmissions;
        $body
      }
      res::ResourceKind::Quizzes => {
        type $r = res::Quizzes;
        $body
      }
      res::ResourceKind::QuizQuestions => {
        type $r = res::QuizQuestions;
        $body
      }
      res::ResourceKind::Grades => {
        type $r = res::Grades;
        $body
      }
      res::ResourceKind::Tests => {
        type $r = res::Tests;
        $body
      }
    }
  }};
}

pub(crate) use with_resource;
