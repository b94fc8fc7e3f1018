//! Parameter automation on the audio clock.
//!
//! Voices never poll wall-clock timers. Everything that moves over the life
//! of a note (amplitude envelope, pitch sweep) is written up front as a list
//! of timed events and then evaluated per sample at the absolute clock time
//! being rendered. Timing is therefore exact regardless of when the control
//! side happened to schedule the note.
//!
//! # Event Semantics
//!
//! ```text
//!   set(v, t)          value jumps to v at t
//!   linear(v, t)       straight line from the previous event to (t, v)
//!   exponential(v, t)  geometric curve from the previous event to (t, v)
//! ```
//!
//! A ramp always starts at the time and value of the event before it (or at
//! time 0 with the initial value when it is the first event). After the last
//! event the value holds.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    time: f64,
    value: f32,
    curve: Curve,
}

/// Smallest magnitude an exponential ramp may target. Geometric curves can't
/// reach or cross zero.
const MIN_EXP_VALUE: f32 = 1.0e-4;

#[derive(Debug, Clone)]
pub struct Automation {
    initial: f32,
    events: Vec<Event>,
}

impl Automation {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::with_capacity(4),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(Event {
            time,
            value,
            curve: Curve::Step,
        });
        self
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) -> &mut Self {
        self.insert(Event {
            time: end_time,
            value,
            curve: Curve::Linear,
        });
        self
    }

    pub fn exponential_ramp_to(&mut self, value: f32, end_time: f64) -> &mut Self {
        let magnitude = value.abs().max(MIN_EXP_VALUE);
        let value = if value < 0.0 { -magnitude } else { magnitude };
        self.insert(Event {
            time: end_time,
            value,
            curve: Curve::Exponential,
        });
        self
    }

    fn insert(&mut self, event: Event) {
        // Keep insertion order for equal timestamps
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }

    /// Time of the last scheduled event (or 0 when nothing is scheduled).
    pub fn end_time(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.time)
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for event in &self.events {
            if event.time <= time {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }

            let span = event.time - prev_time;
            if span <= 0.0 {
                return prev_value;
            }
            let frac = ((time - prev_time) / span).clamp(0.0, 1.0) as f32;

            return match event.curve {
                Curve::Step => prev_value,
                Curve::Linear => prev_value + (event.value - prev_value) * frac,
                Curve::Exponential => {
                    if prev_value == 0.0 || prev_value.signum() != event.value.signum() {
                        prev_value
                    } else {
                        prev_value * (event.value / prev_value).powf(frac)
                    }
                }
            };
        }

        prev_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value_before_events() {
        let mut auto = Automation::new(0.25);
        auto.set_value_at(1.0, 1.0);
        assert!((auto.value_at(0.5) - 0.25).abs() < 1e-6);
        assert!((auto.value_at(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_ramp_midpoint() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 1.0).linear_ramp_to(1.0, 2.0);
        assert!((auto.value_at(1.5) - 0.5).abs() < 1e-6);
        assert!((auto.value_at(3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_exponential_ramp_is_geometric() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(1.0, 0.0).exponential_ramp_to(0.01, 1.0);
        // Halfway through a 1 → 0.01 ramp is the geometric mean, 0.1
        assert!((auto.value_at(0.5) - 0.1).abs() < 1e-4);
        assert!((auto.value_at(1.0) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_exponential_ramp_never_targets_zero() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(1.0, 0.0).exponential_ramp_to(0.0, 1.0);
        let end = auto.value_at(1.0);
        assert!(end > 0.0 && end.is_finite());
    }

    #[test]
    fn test_out_of_order_scheduling_is_sorted() {
        let mut auto = Automation::new(0.0);
        auto.linear_ramp_to(0.0, 2.0);
        auto.set_value_at(1.0, 1.0);
        assert!((auto.value_at(1.5) - 0.5).abs() < 1e-6);
        assert!((auto.end_time() - 2.0).abs() < 1e-9);
    }
}
