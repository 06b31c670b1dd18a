mod anthropic;

pub use anthropic::{
    ContentBlock, MessageRequest, MessageResponse, Role, StopReason, ToolDefinitionApi, Usage,
};
