use async_trait::async_trait;

/// Produces the assistant half of an exchange.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, model_tag: &str, prompt: &str) -> String;
}

/// Stand-in responder that echoes the prompt back.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn respond(&self, _model_tag: &str, prompt: &str) -> String {
        format!("You said: {}", prompt)
    }
}
