use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;

/// One capability: an async function of positional JSON arguments.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, args: Vec<Value>) -> Result<Value, HandlerError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn invoke(&self, args: Vec<Value>) -> Result<Value, HandlerError> {
        (self.0)(args).await
    }
}

/// Deserialize positional arguments into `T`, usually a tuple.
///
/// ```
/// use plugwire_host::parse_args;
/// use serde_json::json;
///
/// let (name, count): (String, u32) = parse_args(vec![json!("x"), json!(3)]).unwrap();
/// assert_eq!((name.as_str(), count), ("x", 3));
/// ```
pub fn parse_args<T: DeserializeOwned>(args: Vec<Value>) -> Result<T, HandlerError> {
    Ok(serde_json::from_value(Value::Array(args))?)
}

/// Capability table mapping method names to handlers.
///
/// Built once and immutable afterwards; clones share the same table, so it
/// can be handed to any number of concurrently running dispatches.
#[derive(Clone, Default)]
pub struct Invoker {
    methods: Arc<HashMap<String, Arc<dyn Handler>>>,
}

impl Invoker {
    pub fn builder() -> InvokerBuilder {
        InvokerBuilder::default()
    }

    /// Look up a handler. `None` means the method is not defined.
    pub fn get(&self, method: &str) -> Option<Arc<dyn Handler>> {
        self.methods.get(method).cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("methods", &self.methods())
            .finish()
    }
}

/// Collects handlers for an [`Invoker`]. Registering a name twice keeps the
/// last handler.
#[derive(Default)]
pub struct InvokerBuilder {
    methods: HashMap<String, Arc<dyn Handler>>,
}

impl InvokerBuilder {
    pub fn register(self, method: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.register_arc(method, Arc::new(handler))
    }

    pub fn register_arc(mut self, method: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.methods.insert(method.into(), handler);
        self
    }

    /// Register an async closure.
    ///
    /// ```
    /// use plugwire_host::Invoker;
    /// use serde_json::Value;
    ///
    /// let invoker = Invoker::builder()
    ///     .register_fn("count", |args: Vec<Value>| async move { Ok(Value::from(args.len())) })
    ///     .build();
    /// assert!(invoker.contains("count"));
    /// ```
    pub fn register_fn<F, Fut>(self, method: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(method, FnHandler(f))
    }

    pub fn build(self) -> Invoker {
        Invoker {
            methods: Arc::new(self.methods),
        }
    }
}
