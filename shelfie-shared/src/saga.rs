/// Ordered steps with reverse compensation
///
/// A [`Saga`] is a list of [`SagaStep`]s run in order against a shared
/// context. When a step fails, every step that already completed is asked to
/// compensate, newest first, and the failing step's error is returned. The
/// failing step itself is not compensated.
///
/// Compensation is best-effort: `compensate` cannot fail, so a step that
/// can't undo its work logs and moves on.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use shelfie_shared::saga::{Saga, SagaStep};
///
/// struct Push(u32);
///
/// #[async_trait]
/// impl SagaStep<Vec<u32>, String> for Push {
///     fn name(&self) -> &'static str {
///         "push"
///     }
///
///     async fn execute(&self, ctx: &mut Vec<u32>) -> Result<(), String> {
///         ctx.push(self.0);
///         Ok(())
///     }
///
///     async fn compensate(&self, ctx: &mut Vec<u32>) {
///         ctx.retain(|v| *v != self.0);
///     }
/// }
///
/// # async fn example() {
/// let saga = Saga::new("demo").step(Push(1)).step(Push(2));
/// let mut ctx = Vec::new();
/// saga.run(&mut ctx).await.unwrap();
/// assert_eq!(ctx, vec![1, 2]);
/// # }
/// ```

use async_trait::async_trait;

/// One forward action and its compensation
#[async_trait]
pub trait SagaStep<C: Send, E>: Send + Sync {
    /// Step name used in logs
    fn name(&self) -> &'static str;

    /// Performs the step
    async fn execute(&self, ctx: &mut C) -> Result<(), E>;

    /// Undoes a completed step
    ///
    /// Only called if `execute` succeeded and a later step failed. The
    /// default does nothing, for steps with nothing to undo.
    async fn compensate(&self, _ctx: &mut C) {}
}

/// An ordered list of steps
pub struct Saga<C: Send, E> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep<C, E>>>,
}

impl<C: Send, E: std::fmt::Display + Send> Saga<C, E> {
    /// Creates an empty saga
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Appends a step
    pub fn step(mut self, step: impl SagaStep<C, E> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order
    ///
    /// On the first failure, completed steps are compensated in reverse
    /// order and the failing step's error is returned. No step is retried.
    pub async fn run(&self, ctx: &mut C) -> Result<(), E> {
        for (index, step) in self.steps.iter().enumerate() {
            tracing::debug!(saga = self.name, step = step.name(), index, "Executing saga step");

            if let Err(error) = step.execute(ctx).await {
                tracing::warn!(
                    saga = self.name,
                    step = step.name(),
                    index,
                    error = %error,
                    "Saga step failed, unwinding"
                );

                for completed in self.steps[..index].iter().rev() {
                    tracing::debug!(saga = self.name, step = completed.name(), "Compensating saga step");
                    completed.compensate(ctx).await;
                }

                tracing::info!(saga = self.name, unwound = index, "Saga rolled back");
                return Err(error);
            }
        }

        tracing::debug!(saga = self.name, steps = self.steps.len(), "Saga completed");
        Ok(())
    }
}
