//! Execution and redirect state machine.
//!
//! One call runs `Executing -> Evaluating` for every hop, then either stops
//! (`Done`/`Failed`) or moves to `Redirecting` and executes the next hop.
//! The number of hops is bounded by the redirect policy.

use bytes::Bytes;
use http::Method;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::prepare::check_scheme;
use crate::client::Client;
use crate::config::{is_redirect_status, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE};
use crate::error_handling::Error;
use crate::response::Response;
use crate::transport::{OutgoingRequest, RawResponse};

/// Redirect settings captured from the request when a call starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct RedirectPolicy {
    pub(super) allow_redirect: bool,
    pub(super) save_history: bool,
    pub(super) max_redirects: usize,
}

/// What to do after evaluating one response.
enum Step {
    Done(Response),
    Redirect { location: String, status: u16 },
}

/// Drives one call to completion.
pub(super) async fn follow(
    client: &Client,
    mut request: OutgoingRequest,
    policy: RedirectPolicy,
    normalize_path: bool,
    cancel: Option<&CancellationToken>,
) -> Result<Response, Error> {
    let mut redirects = 0usize;
    let mut history: Vec<Response> = Vec::new();

    loop {
        // Executing
        let raw = execute(client, &request, cancel).await?;

        // Evaluating
        let status = raw.status;
        let snapshot = Response::from_exchange(raw, request.clone());
        let step = evaluate(snapshot, status, policy, &mut redirects, &mut history, &request)?;

        // Redirecting
        let (location, status) = match step {
            Step::Done(response) => return Ok(response),
            Step::Redirect { location, status } => (location, status),
        };
        let next = request.url.join(&location).map_err(|source| Error::UrlParse {
            url: location.clone(),
            source,
        })?;
        check_scheme(&next, &location)?;

        if request.method == Method::POST && (status == 301 || status == 302) {
            request.method = Method::GET;
            request.body = Bytes::new();
            request.remove_header(HEADER_CONTENT_LENGTH);
            request.remove_header(HEADER_CONTENT_TYPE);
        }
        debug!("Following {} redirect {} -> {}", status, request.url, next);
        request.redirect_to(next, Some(&location), normalize_path);
    }
}

async fn execute(
    client: &Client,
    request: &OutgoingRequest,
    cancel: Option<&CancellationToken>,
) -> Result<RawResponse, Error> {
    debug!("{} {}", request.method, request.url);
    let result = match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Cancelled),
                result = client.execute(request.clone()) => result,
            }
        }
        None => client.execute(request.clone()).await,
    };
    result.map_err(|source| Error::Transport {
        url: request.url.to_string(),
        source,
    })
}

fn evaluate(
    snapshot: Response,
    status: u16,
    policy: RedirectPolicy,
    redirects: &mut usize,
    history: &mut Vec<Response>,
    request: &OutgoingRequest,
) -> Result<Step, Error> {
    if !policy.allow_redirect {
        return Ok(Step::Done(snapshot));
    }

    if !is_redirect_status(status) {
        if !policy.save_history {
            return Ok(Step::Done(snapshot));
        }
        history.push(snapshot.clone());
        return Ok(Step::Done(snapshot.with_history(std::mem::take(history))));
    }

    *redirects += 1;
    if *redirects > policy.max_redirects {
        warn!(
            "Too many redirects from {} (max {})",
            request.url, policy.max_redirects
        );
        return Err(Error::TooManyRedirects {
            max: policy.max_redirects,
        });
    }

    let location = snapshot.location().to_string();
    if location.is_empty() {
        warn!("{} redirect from {} has no Location", status, request.url);
        return Err(Error::MissingLocation {
            url: request.url.to_string(),
            status,
        });
    }

    if policy.save_history {
        history.push(snapshot);
    }
    Ok(Step::Redirect { location, status })
}
