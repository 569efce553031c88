//! Depth-first evaluation of the node tree.
//!
//! [`render_nodes`] is the loop every tag uses for its bodies: it runs the
//! guard's checkpoints at each node boundary, dispatches tags to their
//! registry capability, and stops early when a `break` or `continue` is
//! pending so the enclosing loop can handle it.

pub mod eval;

use crate::ast::{Document, Node};
use crate::context::Context;
use crate::core::RenderError;

pub use eval::{evaluate, evaluate_filtered, is_true};

/// Render a sequence of nodes, appending to `out`.
pub fn render_nodes(nodes: &[Node], ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
    for node in nodes {
        ctx.guard().checkpoint()?;
        render_node(node, ctx, out)?;
        ctx.guard().check_output(out.len())?;
        if ctx.is_interrupted() {
            break;
        }
    }
    Ok(())
}

/// Render a single node.
pub fn render_node(node: &Node, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
    match node {
        Node::Literal(text) => out.push_str(text),
        Node::Output(output) => {
            let value = evaluate_filtered(&output.expr, ctx)?;
            out.push_str(&value.to_text());
        }
        Node::Tag(call) | Node::Block(call) => {
            let Some(tag) = ctx.registry().tag(&call.name) else {
                return Err(RenderError::UnknownTag {
                    name: call.name.clone(),
                });
            };
            tag.render(call, ctx, out)?;
        }
        Node::Document(document) => render_document(document, ctx, out)?,
    }
    Ok(())
}

/// Render a nested document one scope deeper.
pub fn render_document(
    document: &Document,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    if let Some(name) = &document.name {
        tracing::trace!(partial = %name, depth = ctx.guard().depth(), "Rendering nested document");
    }
    ctx.nested(|ctx| render_nodes(&document.nodes, ctx, out))
}

/// Render nodes into a fresh buffer one scope deeper.
pub fn render_to_string(nodes: &[Node], ctx: &mut Context<'_>) -> Result<String, RenderError> {
    let mut buffer = String::new();
    ctx.nested(|ctx| render_nodes(nodes, ctx, &mut buffer))?;
    Ok(buffer)
}
