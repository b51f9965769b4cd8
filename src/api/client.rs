use color_eyre::Result;
use futures::future::{AbortRegistration, Abortable};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{ApiEnrollmentRequest, ApiPage, ApiPredictRequest, ApiPrediction};
use super::error::{ApiError, RequestFailure, ValidationErrors};
use super::params::Filter;
use super::resource::{ListParams, Resource};
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use super::types::{Enrollment, Ref};
use crate::cache::{ItemId, Page};
use crate::config::Config;
use crate::scoring::Prediction;

/// Typed client of the learning-management REST API.
///
/// Status handling lives here; the transport only moves bytes.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  base: Url,
  /// Base URL of the separate AI-likelihood service
  ai_base: Option<Url>,
  page_size: u32,
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>, base: Url, page_size: u32) -> Self {
    Self {
      transport,
      base,
      ai_base: None,
      page_size: page_size.max(1),
    }
  }

  pub fn with_ai_url(mut self, ai_base: Option<Url>) -> Self {
    self.ai_base = ai_base;
    self
  }

  pub fn from_config(config: &Config) -> Result<Self> {
    let token = Config::get_api_token();
    let transport = ReqwestTransport::new(config.timeout(), token.as_deref())?;
    Ok(
      Self::new(
        Arc::new(transport),
        config.api_url()?,
        config.api.page_size,
      )
      .with_ai_url(config.ai_url()?),
    )
  }

  /// Items per page for list requests.
  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  /// `<base>/v1/<segments...>`, each segment percent-encoded.
  fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestFailure> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| RequestFailure::Transport(format!("{} cannot be a base URL", self.base)))?
      .pop_if_empty()
      .push("v1")
      .extend(segments);
    Ok(url)
  }

  async fn send(
    &self,
    method: Method,
    url: Url,
    body: Option<serde_json::Value>,
  ) -> Result<HttpResponse, RequestFailure> {
    debug!(%method, %url, "request");
    let response = self
      .transport
      .send(HttpRequest { method, url, body })
      .await?;
    debug!(status = response.status, bytes = response.body.len(), "response");
    Ok(response)
  }

  /// Fetch one page of `R`.
  ///
  /// `page` is 1-based. The next page is `page + 1` when the server says
  /// there is more. If `registration` is aborted before the response
  /// arrives the call returns [`ApiError::Cancelled`].
  pub async fn fetch_page<R: Resource>(
    &self,
    page: u32,
    limit: u32,
    params: &ListParams<R>,
    registration: AbortRegistration,
  ) -> Result<Page<R::Item>, ApiError> {
    let fetch_error = |source| ApiError::Fetch {
      resource: R::NAME,
      source,
    };

    let mut url = self.endpoint(&[R::NAME]).map_err(fetch_error)?;
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("page", &page.to_string());
      query.append_pair("limit", &limit.max(1).to_string());
      if !params.filter.is_empty() {
        query.append_pair("filters", &to_json(&params.filter).map_err(fetch_error)?);
      }
      if let Some(sort) = &params.sort {
        query.append_pair("sort", &to_json(&[sort]).map_err(fetch_error)?);
      }
    }

    let response = match Abortable::new(self.send(Method::GET, url, None), registration).await {
      Ok(result) => result.map_err(fetch_error)?,
      Err(_aborted) => {
        debug!(resource = R::NAME, page, "list request aborted");
        return Err(ApiError::Cancelled);
      }
    };

    if response.status != 200 {
      warn!(resource = R::NAME, page, status = response.status, "list request failed");
      return Err(fetch_error(RequestFailure::Status(response.status)));
    }

    let body: ApiPage<R::Item> = decode(&response.body).map_err(fetch_error)?;
    let next_page = body.has_next_page.then_some(page + 1);
    Ok(Page::new(body.data, next_page))
  }

  /// Fetch one item of `R` by id.
  pub async fn get<R: Resource>(&self, id: &ItemId) -> Result<R::Item, ApiError> {
    let fetch_error = |source| ApiError::Fetch {
      resource: R::NAME,
      source,
    };
    let id = id.to_string();
    let url = self.endpoint(&[R::NAME, &id]).map_err(fetch_error)?;
    let response = self.send(Method::GET, url, None).await.map_err(fetch_error)?;
    if response.status != 200 {
      return Err(fetch_error(RequestFailure::Status(response.status)));
    }
    decode(&response.body).map_err(fetch_error)
  }

  /// Create an item of `R`.
  pub async fn create<R: Resource>(&self, input: &R::Input) -> Result<R::Item, ApiError> {
    let url = self.endpoint(&[R::NAME]).map_err(|source| ApiError::Write {
      resource: R::NAME,
      source,
    })?;
    self.write::<R, R::Item>(Method::POST, url, input).await
  }

  /// Apply a partial update to an item of `R`.
  pub async fn update<R: Resource>(&self, id: &ItemId, input: &R::Input) -> Result<R::Item, ApiError> {
    let id = id.to_string();
    let url = self
      .endpoint(&[R::NAME, &id])
      .map_err(|source| ApiError::Write {
        resource: R::NAME,
        source,
      })?;
    self.write::<R, R::Item>(Method::PATCH, url, input).await
  }

  /// Delete an item of `R`. The response body is ignored.
  pub async fn delete<R: Resource>(&self, id: &ItemId) -> Result<(), ApiError> {
    let delete_error = |source| ApiError::Delete {
      resource: R::NAME,
      id: id.clone(),
      source,
    };
    let raw_id = id.to_string();
    let url = self.endpoint(&[R::NAME, &raw_id]).map_err(delete_error)?;
    let response = self.send(Method::DELETE, url, None).await.map_err(delete_error)?;
    match response.status {
      200 | 204 => Ok(()),
      status => Err(delete_error(RequestFailure::Status(status))),
    }
  }

  /// Enroll a student in a course.
  pub async fn enroll(&self, student: &ItemId, course: &ItemId) -> Result<Enrollment, ApiError> {
    let url = self
      .endpoint(&["enrollments"])
      .map_err(|source| ApiError::Write {
        resource: "enrollments",
        source,
      })?;
    let body = ApiEnrollmentRequest {
      student: Ref::from(student.clone()),
      course: Ref::from(course.clone()),
    };
    self.write_named("enrollments", Method::POST, url, &body).await
  }

  /// Ask the AI service how likely `text` is machine-written.
  pub async fn predict(&self, text: &str) -> Result<Prediction, ApiError> {
    let predict_error = |source| ApiError::Predict { source };
    let base = self.ai_base.as_ref().ok_or(ApiError::AiNotConfigured)?;
    let mut url = base.clone();
    url
      .path_segments_mut()
      .map_err(|_| predict_error(RequestFailure::Transport(format!("{} cannot be a base URL", base))))?
      .pop_if_empty()
      .extend(["predict", ""]);
    let body = serde_json::to_value(ApiPredictRequest { text })
      .map_err(|e| predict_error(RequestFailure::Decode(e.to_string())))?;
    let response = self
      .send(Method::POST, url, Some(body))
      .await
      .map_err(predict_error)?;
    match response.status {
      200 | 201 => {
        let answer: ApiPrediction = decode(&response.body).map_err(predict_error)?;
        Ok(Prediction {
          score: answer.prediction,
        })
      }
      status => {
        warn!(status, "prediction request failed");
        Err(predict_error(RequestFailure::Status(status)))
      }
    }
  }

  async fn write<R: Resource, T: DeserializeOwned>(
    &self,
    method: Method,
    url: Url,
    input: &R::Input,
  ) -> Result<T, ApiError> {
    self.write_named(R::NAME, method, url, input).await
  }

  /// POST/PATCH with the status rules shared by every write: `200`/`201`
  /// carry the saved record, `422` carries per-field codes.
  async fn write_named<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    resource: &'static str,
    method: Method,
    url: Url,
    body: &B,
  ) -> Result<T, ApiError> {
    let write_error = |source| ApiError::Write { resource, source };
    let body = serde_json::to_value(body)
      .map_err(|e| write_error(RequestFailure::Decode(e.to_string())))?;
    let response = self.send(method, url, Some(body)).await.map_err(write_error)?;
    match response.status {
      200 | 201 => decode(&response.body).map_err(write_error),
      422 => {
        let errors = ValidationErrors::from_body(&response.body);
        warn!(resource, %errors, "write rejected");
        Err(ApiError::Validation { resource, errors })
      }
      status => Err(write_error(RequestFailure::Status(status))),
    }
  }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RequestFailure> {
  serde_json::to_string(value).map_err(|e| RequestFailure::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RequestFailure> {
  serde_json::from_slice(body).map_err(|e| RequestFailure::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::params::{SortOrder, SortSpec};
  use crate::api::resource::{CourseFilter, CourseInput, CourseSort, Courses, QuizQuestions, Tests};
  use crate::api::transport::testing::{query_param, FakeTransport};
  use futures::future::AbortHandle;
  use serde_json::json;

  fn client(transport: FakeTransport) -> (ApiClient, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    let base = Url::parse("https://lms.example.com/api").unwrap();
    (ApiClient::new(transport.clone(), base, 10), transport)
  }

  fn registration() -> AbortRegistration {
    AbortHandle::new_pair().1
  }

  #[tokio::test]
  async fn test_fetch_page_request_shape() {
    let (client, transport) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(
        200,
        &json!({ "data": [{ "id": "1" }], "hasNextPage": true }),
      ))
    }));
    let params = ListParams::<Courses>::new(
      Some(SortSpec::new(CourseSort::CourseName, SortOrder::Asc)),
      CourseFilter::parse("courseCreators=u1").unwrap(),
    );

    let page = client.fetch_page(2, 10, &params, registration()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next_page, Some(3));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url.path(), "/api/v1/courses");
    assert_eq!(query_param(request, "page").as_deref(), Some("2"));
    assert_eq!(query_param(request, "limit").as_deref(), Some("10"));
    assert_eq!(
      query_param(request, "filters").as_deref(),
      Some(r#"{"courseCreators":[{"id":"u1"}]}"#)
    );
    assert_eq!(
      query_param(request, "sort").as_deref(),
      Some(r#"[{"orderBy":"courseName","order":"ASC"}]"#)
    );
  }

  #[tokio::test]
  async fn test_fetch_page_omits_empty_params() {
    let (client, transport) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(200, &json!({ "data": [], "hasNextPage": false })))
    }));
    let page = client
      .fetch_page(1, 10, &ListParams::<Tests>::default(), registration())
      .await
      .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.next_page, None);

    let request = &transport.requests()[0];
    assert_eq!(query_param(request, "filters"), None);
    assert_eq!(query_param(request, "sort"), None);
  }

  #[tokio::test]
  async fn test_fetch_page_non_200_is_fetch_failure() {
    let (client, _) = client(FakeTransport::new(|_| Ok(HttpResponse::new(500, "oops"))));
    let err = client
      .fetch_page(1, 10, &ListParams::<Courses>::default(), registration())
      .await
      .unwrap_err();
    assert_eq!(
      err,
      ApiError::Fetch {
        resource: "courses",
        source: RequestFailure::Status(500)
      }
    );
  }

  #[tokio::test]
  async fn test_fetch_page_transport_error() {
    let (client, _) = client(FakeTransport::new(|_| {
      Err(RequestFailure::Transport("connection refused".to_string()))
    }));
    let err = client
      .fetch_page(1, 10, &ListParams::<Courses>::default(), registration())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Fetch { .. }));
  }

  #[tokio::test]
  async fn test_fetch_page_cancelled() {
    let (client, transport) = client(
      FakeTransport::new(|_| Ok(HttpResponse::json(200, &json!({ "data": [] })))).hold(Method::GET),
    );
    let (handle, registration) = AbortHandle::new_pair();
    handle.abort();
    let err = client
      .fetch_page(1, 10, &ListParams::<Courses>::default(), registration)
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::Cancelled);
    transport.release();
  }

  #[tokio::test]
  async fn test_quiz_question_ids_are_numbers() {
    let (client, _) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(
        200,
        &json!({ "data": [{ "id": 4, "options": ["a"] }], "hasNextPage": false }),
      ))
    }));
    let page = client
      .fetch_page(1, 10, &ListParams::<QuizQuestions>::default(), registration())
      .await
      .unwrap();
    assert_eq!(page.items[0].id, ItemId::Num(4));
  }

  #[tokio::test]
  async fn test_get_item() {
    let (client, transport) = client(FakeTransport::new(|req| {
      if req.url.path() == "/api/v1/courses/c%2F1" {
        Ok(HttpResponse::json(200, &json!({ "id": "c/1", "courseName": "Rust" })))
      } else {
        Ok(HttpResponse::new(404, ""))
      }
    }));
    let course = client.get::<Courses>(&ItemId::from("c/1")).await.unwrap();
    assert_eq!(course.course_name.as_deref(), Some("Rust"));

    let missing = client.get::<Courses>(&ItemId::from("x")).await.unwrap_err();
    assert_eq!(
      missing,
      ApiError::Fetch {
        resource: "courses",
        source: RequestFailure::Status(404)
      }
    );
    assert_eq!(transport.count(&Method::GET), 2);
  }

  #[tokio::test]
  async fn test_create_sends_body_and_accepts_201() {
    let (client, transport) = client(FakeTransport::new(|req| {
      let mut saved = req.body.clone().unwrap_or_default();
      saved["id"] = json!("new");
      Ok(HttpResponse::json(201, &saved))
    }));
    let input = CourseInput {
      course_name: Some("Rust".to_string()),
      course_creator: Some(Ref::new("u1")),
      ..Default::default()
    };
    let course = client.create::<Courses>(&input).await.unwrap();
    assert_eq!(course.id, ItemId::from("new"));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url.path(), "/api/v1/courses");
    assert_eq!(
      request.body,
      Some(json!({ "courseName": "Rust", "courseCreator": { "id": "u1" } }))
    );
  }

  #[tokio::test]
  async fn test_create_validation_failure() {
    let (client, _) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(
        422,
        &json!({ "status": 422, "errors": { "courseName": "required" } }),
      ))
    }));
    let err = client.create::<Courses>(&CourseInput::default()).await.unwrap_err();
    match err {
      ApiError::Validation { resource, errors } => {
        assert_eq!(resource, "courses");
        assert_eq!(errors.get("courseName"), Some("required"));
      }
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_update_uses_patch() {
    let (client, transport) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(200, &json!({ "id": "c1", "courseName": "New" })))
    }));
    let input = CourseInput {
      course_name: Some("New".to_string()),
      ..Default::default()
    };
    let course = client.update::<Courses>(&ItemId::from("c1"), &input).await.unwrap();
    assert_eq!(course.course_name.as_deref(), Some("New"));
    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.url.path(), "/api/v1/courses/c1");
  }

  #[tokio::test]
  async fn test_write_other_status_is_write_failure() {
    let (client, _) = client(FakeTransport::new(|_| Ok(HttpResponse::new(500, ""))));
    let err = client.create::<Courses>(&CourseInput::default()).await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Write {
        resource: "courses",
        source: RequestFailure::Status(500)
      }
    );
  }

  #[tokio::test]
  async fn test_delete_statuses() {
    let (client, _) = client(FakeTransport::new(|req| {
      let status = match req.url.path() {
        "/api/v1/courses/a" => 200,
        "/api/v1/courses/b" => 204,
        _ => 404,
      };
      Ok(HttpResponse::new(status, ""))
    }));
    assert!(client.delete::<Courses>(&ItemId::from("a")).await.is_ok());
    assert!(client.delete::<Courses>(&ItemId::from("b")).await.is_ok());
    assert_eq!(
      client.delete::<Courses>(&ItemId::from("c")).await,
      Err(ApiError::Delete {
        resource: "courses",
        id: ItemId::from("c"),
        source: RequestFailure::Status(404)
      })
    );
  }

  #[tokio::test]
  async fn test_enroll() {
    let (client, transport) = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(201, &json!({ "id": "e1" })))
    }));
    let enrollment = client
      .enroll(&ItemId::from("s1"), &ItemId::from("c1"))
      .await
      .unwrap();
    assert_eq!(enrollment.id, ItemId::from("e1"));
    let request = &transport.requests()[0];
    assert_eq!(request.url.path(), "/api/v1/enrollments");
    assert_eq!(
      request.body,
      Some(json!({ "student": { "id": "s1" }, "course": { "id": "c1" } }))
    );
  }

  #[tokio::test]
  async fn test_predict_posts_text_to_ai_service() {
    let (client, transport) = client(FakeTransport::new(|req| {
      if req.url.as_str() == "https://ai.example.com/predict/" {
        Ok(HttpResponse::json(200, &json!({ "text": "essay", "prediction": 64.5 })))
      } else {
        Ok(HttpResponse::new(404, ""))
      }
    }));
    let client = client.with_ai_url(Some(Url::parse("https://ai.example.com").unwrap()));

    let prediction = client.predict("essay").await.unwrap();
    assert_eq!(prediction, Prediction { score: 64.5 });

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.body, Some(json!({ "text": "essay" })));
  }

  #[tokio::test]
  async fn test_predict_failures() {
    let (client, transport) = client(FakeTransport::new(|_| Ok(HttpResponse::new(503, ""))));
    assert_eq!(client.predict("essay").await, Err(ApiError::AiNotConfigured));
    assert!(transport.requests().is_empty());

    let client = client.with_ai_url(Some(Url::parse("https://ai.example.com/v2/").unwrap()));
    assert_eq!(
      client.predict("essay").await,
      Err(ApiError::Predict {
        source: RequestFailure::Status(503)
      })
    );
    assert_eq!(transport.requests()[0].url.path(), "/v2/predict/");
  }

  #[test]
  fn test_endpoint_with_trailing_slash_base() {
    let transport: Arc<dyn Transport> =
      Arc::new(FakeTransport::new(|_| Ok(HttpResponse::new(200, ""))));
    let client = ApiClient::new(transport, Url::parse("http://localhost:3000/").unwrap(), 0);
    assert_eq!(
      client.endpoint(&["grades"]).unwrap().as_str(),
      "http://localhost:3000/v1/grades"
    );
    assert_eq!(client.page_size(), 1);
  }
}
