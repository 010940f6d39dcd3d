use crate::config::ExceptionOptions;
use crate::error::BoxError;
use crate::exception::{
    ExceptionRecord, HttpException, HttpExceptionFilter, RequestContext, ResponseFormat,
    SharedError, Thrown, normalize,
};
use crate::interceptor::{Interceptor, InterceptorResult, Next};
use crate::observer;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

/// Turns downstream failures into exception responses
///
/// A failure is either an error returned by the next service, a response
/// carrying a [`Thrown`] extension, or a plain 404 response. Everything else
/// passes through untouched.
pub struct ExceptionInterceptor {
    options: Arc<ExceptionOptions>,
    filter: HttpExceptionFilter,
}

impl ExceptionInterceptor {
    pub fn new(options: ExceptionOptions) -> Self {
        let filter = HttpExceptionFilter::new(options.negotiation());
        Self {
            options: Arc::new(options),
            filter,
        }
    }

    async fn handle(
        &self,
        error: SharedError,
        request: RequestContext,
        prior: Option<Response>,
    ) -> InterceptorResult {
        let record = Arc::new(normalize(&*error, Some(&request), &self.options));
        let format = self.filter.negotiate(&request, prior.as_ref());

        let response = if let Some(custom) = self.options.custom() {
            custom.handle(&record, &request, &error).await?
        } else if let Some(page) = self.not_found_page(&record, format).await? {
            (StatusCode::NOT_FOUND, Html(page)).into_response()
        } else {
            self.filter.catch(&record)
        };

        self.schedule_log(record, request, error);
        Ok(response)
    }

    /// Render the not-found page when it applies to this failure
    async fn not_found_page(
        &self,
        record: &ExceptionRecord,
        format: ResponseFormat,
    ) -> Result<Option<String>, BoxError> {
        if !record.is_not_found() || format != ResponseFormat::Html {
            return Ok(None);
        }
        match (self.options.not_found_page(), self.options.renderer()) {
            (Some(page), Some(renderer)) => Ok(Some(renderer.render(page, record).await?)),
            _ => Ok(None),
        }
    }

    fn schedule_log(&self, record: Arc<ExceptionRecord>, request: RequestContext, error: SharedError) {
        if let (Some(logger), Some(worker)) = (self.options.logger(), self.options.worker()) {
            let logger = Arc::clone(logger);
            worker.submit(move || logger.log(&record, Some(&request), &*error));
        }
    }
}

#[async_trait]
impl Interceptor for ExceptionInterceptor {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        observer::install(&self.options);

        let context = RequestContext::from_request(&request);

        let (error, prior): (SharedError, Option<Response>) = match next.run(request).await {
            Ok(mut response) => match response.extensions_mut().remove::<Thrown>() {
                Some(thrown) => (thrown.0, Some(response)),
                None if response.status() == StatusCode::NOT_FOUND => {
                    let error: SharedError = Arc::new(HttpException::unmatched());
                    (error, Some(response))
                }
                None => return Ok(response),
            },
            Err(e) => (SharedError::from(e), None),
        };

        self.handle(error, context, prior).await
    }
}
