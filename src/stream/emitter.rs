use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde_json::Map;
use std::iter;

use super::frame::{ChannelConnection, Connection, FrameWriter};
use crate::ai_sdk::{ContentBlock, MessageResponse, Role};
use crate::protocol::{
    BlockDelta, BlockStart, MessageDelta, MessageStart, OutputUsage, StartUsage, StreamEvent,
};

// Frames buffered between the emitting task and the response body.
const FRAME_BUFFER: usize = 16;

/// Replays a complete message as the front-protocol event sequence:
/// `message_start`, then start/delta/stop per content block, then
/// `message_delta` and `message_stop`.
///
/// Write failures are absorbed by the [`FrameWriter`]; nothing is reported
/// back once the stream has begun.
pub async fn emit<C: Connection>(writer: &mut FrameWriter<C>, response: &MessageResponse) {
    let signed_blocks = response
        .content
        .iter()
        .filter(|block| block.thought_signature().is_some())
        .count();
    tracing::debug!(
        id = %response.id,
        blocks = response.content.len(),
        signed_blocks,
        "emitting message stream"
    );

    for event in events(response) {
        writer.write(&event).await;
    }
}

/// Builds a `200 text/event-stream` response and streams `response` into it
/// from a spawned task.
pub fn sse_response(response: MessageResponse) -> Response {
    let (conn, body) = ChannelConnection::new(FRAME_BUFFER);

    tokio::spawn(async move {
        let mut writer = FrameWriter::new(conn);
        emit(&mut writer, &response).await;
    });

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

pub(crate) fn events(response: &MessageResponse) -> impl Iterator<Item = StreamEvent<'_>> {
    let blocks = response
        .content
        .iter()
        .enumerate()
        .flat_map(|(index, block)| {
            let start = StreamEvent::ContentBlockStart {
                index,
                content_block: block_start(block),
            };
            let delta =
                block_delta(block).map(|delta| StreamEvent::ContentBlockDelta { index, delta });

            iter::once(start)
                .chain(delta)
                .chain(iter::once(StreamEvent::ContentBlockStop { index }))
        });

    iter::once(message_start(response)).chain(blocks).chain([
        StreamEvent::MessageDelta {
            delta: MessageDelta {
                stop_reason: response.stop_reason,
                stop_sequence: None,
            },
            usage: OutputUsage {
                output_tokens: response.usage.output_tokens,
            },
        },
        StreamEvent::MessageStop,
    ])
}

fn message_start(response: &MessageResponse) -> StreamEvent<'_> {
    StreamEvent::MessageStart {
        message: MessageStart {
            id: &response.id,
            kind: "message",
            role: Role::Assistant,
            model: &response.model,
            content: [],
            stop_reason: None,
            stop_sequence: None,
            usage: StartUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: 0,
            },
        },
    }
}

fn block_start(block: &ContentBlock) -> BlockStart<'_> {
    match block {
        ContentBlock::Text { .. } => BlockStart::Text { text: "" },
        ContentBlock::ToolUse { id, name, .. } => BlockStart::ToolUse {
            id,
            name,
            input: Map::new(),
        },
        ContentBlock::Signature { .. } => BlockStart::Signature,
    }
}

// A signature-only block has nothing to deliver.
fn block_delta(block: &ContentBlock) -> Option<BlockDelta<'_>> {
    match block {
        ContentBlock::Text { text, .. } => Some(BlockDelta::TextDelta { text }),
        ContentBlock::ToolUse { input, .. } => Some(BlockDelta::InputJsonDelta {
            partial_json: serde_json::to_string(input).unwrap_or_default(),
        }),
        ContentBlock::Signature { .. } => None,
    }
}
