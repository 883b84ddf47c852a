//! Adapter from container bytes to pipeline samples
//!
//! The container writer produces a plain byte stream. [`SampleWriter`] wraps
//! every chunk it receives into a binary [`Sample`] and pushes it into an
//! embedded [`Node`], so the serialized container can be consumed by any
//! attached element.

use crate::container::ContainerSink;
use recmux_core::{Element, Node, Sample};
use std::io;
use std::sync::Arc;

/// Byte sink that forwards writes as binary samples
#[derive(Debug, Clone)]
pub struct SampleWriter {
    node: Node,
}

impl SampleWriter {
    /// Create a writer with its own fan-out node
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            node: Node::new(id),
        }
    }

    /// Attach a consumer of the byte stream
    pub fn attach(&self, child: Arc<dyn Element>) {
        self.node.attach(child);
    }

    /// The embedded node
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Close the embedded node. Always succeeds.
    pub fn close(&self) -> io::Result<()> {
        self.node.close();
        Ok(())
    }
}

impl io::Write for SampleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.node
            .write(&Sample::binary(buf.to_vec()))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ContainerSink for SampleWriter {
    fn close(&mut self) -> io::Result<()> {
        SampleWriter::close(self)
    }
}
