//! The per-request accumulator threaded through the pipeline stages.

use super::PipelineError;

/// Request inputs plus the fields filled in by each stage, in stage order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub user_id: String,
    pub query: String,
    pub lat: f64,
    pub lon: f64,
    pub masked_query: Option<String>,
    pub context_str: Option<String>,
    pub rag_str: Option<String>,
    pub response: Option<String>,
}

/// The single field a stage produces.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    MaskedQuery(String),
    Context(String),
    Rag(String),
    Response(String),
}

impl StateUpdate {
    pub fn field_name(&self) -> &'static str {
        match self {
            StateUpdate::MaskedQuery(_) => "masked_query",
            StateUpdate::Context(_) => "context_str",
            StateUpdate::Rag(_) => "rag_str",
            StateUpdate::Response(_) => "response",
        }
    }
}

impl PipelineState {
    pub fn new(user_id: &str, query: &str, lat: f64, lon: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            query: query.to_string(),
            lat,
            lon,
            masked_query: None,
            context_str: None,
            rag_str: None,
            response: None,
        }
    }

    /// Merges a stage's output. Each field can be written once.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), PipelineError> {
        let field = update.field_name();
        let (slot, value) = match update {
            StateUpdate::MaskedQuery(v) => (&mut self.masked_query, v),
            StateUpdate::Context(v) => (&mut self.context_str, v),
            StateUpdate::Rag(v) => (&mut self.rag_str, v),
            StateUpdate::Response(v) => (&mut self.response, v),
        };
        if slot.is_some() {
            return Err(PipelineError::FieldAlreadySet(field));
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn masked_query(&self) -> Result<&str, PipelineError> {
        self.masked_query
            .as_deref()
            .ok_or(PipelineError::MissingField("masked_query"))
    }

    pub fn context_str(&self) -> Result<&str, PipelineError> {
        self.context_str
            .as_deref()
            .ok_or(PipelineError::MissingField("context_str"))
    }

    pub fn rag_str(&self) -> Result<&str, PipelineError> {
        self.rag_str
            .as_deref()
            .ok_or(PipelineError::MissingField("rag_str"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_write_once() {
        let mut state = PipelineState::new("USR-001", "hi", 0.0, 0.0);
        state
            .apply(StateUpdate::MaskedQuery("hi".to_string()))
            .unwrap();
        let err = state
            .apply(StateUpdate::MaskedQuery("again".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FieldAlreadySet("masked_query")));
        assert_eq!(state.masked_query.as_deref(), Some("hi"));
    }

    #[test]
    fn reading_an_unfilled_field_fails() {
        let state = PipelineState::new("USR-001", "hi", 0.0, 0.0);
        assert!(matches!(
            state.rag_str(),
            Err(PipelineError::MissingField("rag_str"))
        ));
    }
}
