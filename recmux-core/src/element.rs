//! Pipeline element trait and the fan-out node shared by all elements
//!
//! Elements form a tree: samples written into an element are processed and
//! forwarded to every attached child. Closing an element closes its children,
//! so termination propagates down to the sinks (e.g. a file writer).

use crate::error::{CoreError, CoreResult};
use crate::sample::Sample;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A pipeline element that consumes samples
pub trait Element: Send + Sync {
    /// Element identifier used in logs and errors
    fn id(&self) -> &str;

    /// Consume one sample
    fn write(&self, sample: &Sample) -> CoreResult<()>;

    /// Attach a downstream consumer
    fn attach(&self, child: Arc<dyn Element>);

    /// Terminate the element and everything downstream of it
    fn close(&self);
}

struct NodeInner {
    id: String,
    children: RwLock<Vec<Arc<dyn Element>>>,
    closed: AtomicBool,
    samples_forwarded: AtomicU64,
}

/// Fan-out node: forwards each sample to all attached children
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Create a node with no children
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: id.into(),
                children: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
                samples_forwarded: AtomicU64::new(0),
            }),
        }
    }

    /// Number of attached children
    pub fn child_count(&self) -> usize {
        self.inner.children.read().len()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Samples successfully forwarded so far
    pub fn samples_forwarded(&self) -> u64 {
        self.inner.samples_forwarded.load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> Vec<Arc<dyn Element>> {
        self.inner.children.read().clone()
    }
}

impl Element for Node {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn write(&self, sample: &Sample) -> CoreResult<()> {
        if self.is_closed() {
            return Err(CoreError::ElementClosed {
                element: self.inner.id.clone(),
            });
        }

        let mut first_error = None;
        for child in self.snapshot() {
            if let Err(e) = child.write(sample) {
                tracing::debug!("Node {} child {} write failed: {}", self.inner.id, child.id(), e);
                if first_error.is_none() {
                    first_error = Some(CoreError::Downstream {
                        element: child.id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                self.inner.samples_forwarded.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    fn attach(&self, child: Arc<dyn Element>) {
        tracing::debug!("Node {} attached {}", self.inner.id, child.id());
        self.inner.children.write().push(child);
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for child in self.snapshot() {
            child.close();
        }
        tracing::debug!("Node {} closed", self.inner.id);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("children", &self.child_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        id: String,
        samples: Mutex<Vec<Sample>>,
        closes: AtomicU64,
        fail: bool,
    }

    impl Recorder {
        fn new(id: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                samples: Mutex::new(Vec::new()),
                closes: AtomicU64::new(0),
                fail,
            })
        }
    }

    impl Element for Recorder {
        fn id(&self) -> &str {
            &self.id
        }

        fn write(&self, sample: &Sample) -> CoreResult<()> {
            if self.fail {
                return Err(CoreError::InvalidData {
                    reason: "rejected".to_string(),
                });
            }
            self.samples.lock().push(sample.clone());
            Ok(())
        }

        fn attach(&self, _child: Arc<dyn Element>) {}

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_node_fans_out_to_all_children() {
        let node = Node::new("tee");
        let a = Recorder::new("a", false);
        let b = Recorder::new("b", false);
        node.attach(a.clone());
        node.attach(b.clone());

        node.write(&Sample::binary(vec![1u8, 2, 3])).unwrap();

        assert_eq!(a.samples.lock().len(), 1);
        assert_eq!(b.samples.lock().len(), 1);
        assert_eq!(node.samples_forwarded(), 1);
    }

    #[test]
    fn test_node_reports_first_failure_but_feeds_every_child() {
        let node = Node::new("tee");
        let bad = Recorder::new("bad", true);
        let good = Recorder::new("good", false);
        node.attach(bad);
        node.attach(good.clone());

        let err = node.write(&Sample::binary(vec![9u8])).unwrap_err();
        match err {
            CoreError::Downstream { element, .. } => assert_eq!(element, "bad"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(good.samples.lock().len(), 1);
        assert_eq!(node.samples_forwarded(), 0);
    }

    #[test]
    fn test_node_close_is_idempotent() {
        let node = Node::new("tee");
        let child = Recorder::new("sink", false);
        node.attach(child.clone());

        node.close();
        node.close();

        assert!(node.is_closed());
        assert_eq!(child.closes.load(Ordering::SeqCst), 1);
        assert!(matches!(
            node.write(&Sample::binary(vec![0u8])),
            Err(CoreError::ElementClosed { .. })
        ));
    }

    #[test]
    fn test_node_without_children_accepts_writes() {
        let node = Node::new("empty");
        assert!(node.write(&Sample::binary(vec![0u8])).is_ok());
        assert_eq!(node.child_count(), 0);
    }
}
