use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debounce: a new value takes effect only once it has been
/// left alone for `delay`. Every `set` restarts the timer.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
  delay: Duration,
  value: T,
  pending: Option<(T, Instant)>,
}

impl<T: Clone + PartialEq> Debounce<T> {
  pub fn new(initial: T, delay: Duration) -> Self {
    Self {
      delay,
      value: initial,
      pending: None,
    }
  }

  pub fn set(&mut self, value: T) {
    self.pending = Some((value, Instant::now() + self.delay));
  }

  /// Skip the delay, e.g. when the user presses enter.
  pub fn flush(&mut self) -> bool {
    match self.pending.take() {
      Some((value, _)) => self.apply(value),
      None => false,
    }
  }

  /// Apply the pending value if its deadline passed. Returns `true` when the
  /// settled value changed.
  pub fn poll(&mut self) -> bool {
    let due = matches!(&self.pending, Some((_, deadline)) if Instant::now() >= *deadline);
    due && self.flush()
  }

  /// Wait for the pending value to settle.
  pub async fn settled(&mut self) -> bool {
    if let Some(deadline) = self.deadline() {
      tokio::time::sleep_until(deadline).await;
    }
    self.poll()
  }

  pub fn value(&self) -> &T {
    &self.value
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.pending.as_ref().map(|(_, at)| *at)
  }

  fn apply(&mut self, value: T) -> bool {
    if value == self.value {
      return false;
    }
    self.value = value;
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DELAY: Duration = Duration::from_millis(300);

  #[tokio::test(start_paused = true)]
  async fn test_value_changes_after_quiet_period() {
    let mut input = Debounce::new(String::new(), DELAY);
    input.set("bat".to_string());

    tokio::time::advance(Duration::from_millis(299)).await;
    assert!(!input.poll());
    assert_eq!(input.value(), "");

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(input.poll());
    assert_eq!(input.value(), "bat");
    assert!(!input.is_pending());
  }

  #[tokio::test(start_paused = true)]
  async fn test_each_set_restarts_the_timer() {
    let mut input = Debounce::new(String::new(), DELAY);
    for prefix in ["b", "ba", "bat", "batm", "batma", "batman"] {
      input.set(prefix.to_string());
      tokio::time::advance(Duration::from_millis(200)).await;
      assert!(!input.poll());
    }

    assert_eq!(input.value(), "");
    assert!(input.settled().await);
    assert_eq!(input.value(), "batman");
  }

  #[tokio::test(start_paused = true)]
  async fn test_returning_to_settled_value_is_not_a_change() {
    let mut input = Debounce::new("dune".to_string(), DELAY);
    input.set("dun".to_string());
    input.set("dune".to_string());

    assert!(!input.settled().await);
    assert!(!input.is_pending());
  }

  #[tokio::test(start_paused = true)]
  async fn test_flush() {
    let mut input = Debounce::new(0, DELAY);
    input.set(5);
    assert!(input.flush());
    assert_eq!(*input.value(), 5);
    assert!(!input.flush());
  }
}
