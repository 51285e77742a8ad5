use super::BackendFailure;
use super::BackendResponse;

pub enum Event {
    BackendPromptResponse(BackendResponse),
    BackendFailure(BackendFailure),
}
