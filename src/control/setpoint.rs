// src/control/setpoint.rs - Radiator setpoint PID
use std::time::Duration;

use crate::config::ControlConfig;
use super::{HeaterCommand, HeaterMode};

/// Highest radiator setpoint ever emitted.
pub const MAX_SETPOINT: f64 = 59.0;

/// PID accumulator state carried between samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidAccumulator {
    pub integral_error: f64,
    /// `None` until the first closed-loop sample.
    pub last_error: Option<f64>,
}

impl PidAccumulator {
    pub fn reset(&mut self) {
        self.integral_error = 0.0;
        self.last_error = None;
    }
}

/// Converts a room temperature error into a radiator surface setpoint.
///
/// Far below target the radiator is driven flat out. Near or above target the
/// setpoint is `min + Kp*e + Ki*∫e + Kd*de/dt`, held inside
/// `[min_setpoint, max_setpoint]`. The integral is clamped to
/// `±integral_limit` on every sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_limit: f64,
    full_output_threshold: f64,
    min_setpoint: f64,
    max_setpoint: f64,
}

impl Default for SetpointController {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

impl SetpointController {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            ..Self::default()
        }
    }

    /// Builds the controller from tuning values. Unusable bounds fall back so
    /// that `min_setpoint <= max_setpoint <= MAX_SETPOINT` always holds.
    pub fn from_config(config: &ControlConfig) -> Self {
        let max_setpoint = if config.max_setpoint.is_finite() {
            config.effective_max_setpoint()
        } else {
            MAX_SETPOINT
        };
        let min_setpoint = if config.min_setpoint.is_finite() {
            config.min_setpoint.min(max_setpoint)
        } else {
            max_setpoint
        };
        let integral_limit = if config.integral_limit.is_finite() {
            config.integral_limit.abs()
        } else {
            0.0
        };
        if min_setpoint != config.min_setpoint || max_setpoint != config.max_setpoint {
            tracing::warn!(
                "Setpoint band {}-{}°C adjusted to {}-{}°C",
                config.min_setpoint,
                config.max_setpoint,
                min_setpoint,
                max_setpoint
            );
        }
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            integral_limit,
            full_output_threshold: config.full_output_threshold,
            min_setpoint,
            max_setpoint,
        }
    }

    pub fn gains(&self) -> (f64, f64, f64) {
        (self.kp, self.ki, self.kd)
    }

    pub fn integral_limit(&self) -> f64 {
        self.integral_limit
    }

    /// Calculate the next command. `dt` is the elapsed sample interval.
    pub fn compute(
        &self,
        pid: &mut PidAccumulator,
        target: f64,
        current: f64,
        dt: Duration,
    ) -> HeaterCommand {
        let error = target - current;
        if !error.is_finite() {
            tracing::warn!(
                "Non-finite temperature error (target {}, current {}), holding minimum setpoint",
                target,
                current
            );
            return HeaterCommand::new(HeaterMode::HeatFeedback, self.min_setpoint);
        }

        let delta_error = error - pid.last_error.unwrap_or(error);
        pid.last_error = Some(error);
        pid.integral_error =
            (pid.integral_error + error).clamp(-self.integral_limit, self.integral_limit);

        if error > self.full_output_threshold {
            pid.integral_error = 0.0;
            tracing::debug!("Room {:.2}°C below target, full output", error);
            return HeaterCommand::new(HeaterMode::HeatFeedback, self.max_setpoint);
        }

        let dt_secs = dt.as_secs_f64();
        let derivative = if dt_secs > 0.0 { delta_error / dt_secs } else { 0.0 };

        let p_term = self.kp * error;
        let i_term = self.ki * pid.integral_error;
        let d_term = self.kd * derivative;
        let raw = self.min_setpoint + p_term + i_term + d_term;
        let setpoint = if raw.is_nan() {
            self.min_setpoint
        } else {
            raw.clamp(self.min_setpoint, self.max_setpoint)
        };

        tracing::debug!(
            "PID e={:.2} P={:.2} I={:.2} D={:.3} -> {:.1}°C",
            error,
            p_term,
            i_term,
            d_term,
            setpoint
        );

        if setpoint <= 0.0 {
            return HeaterCommand::off();
        }
        HeaterCommand::new(HeaterMode::HeatFeedback, setpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: Duration = Duration::from_secs(300);

    #[test]
    fn test_large_error_requests_full_output_and_resets_integral() {
        let controller = SetpointController::default();
        for gap in [1.01, 1.5, 2.0, 5.0, 12.0, 40.0] {
            let mut pid = PidAccumulator {
                integral_error: 7.5,
                last_error: Some(0.2),
            };
            let cmd = controller.compute(&mut pid, 22.0, 22.0 - gap, SAMPLE);
            assert_eq!(cmd.mode, HeaterMode::HeatFeedback);
            assert_eq!(cmd.setpoint, 59.0);
            assert_eq!(pid.integral_error, 0.0);
            assert_eq!(pid.last_error, Some(gap));
        }
    }

    #[test]
    fn test_near_target_setpoint_stays_in_band() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator::default();
        let readings = [21.0, 21.5, 22.3, 25.0, 30.0, 21.9, 18.0, 21.2, 22.0, 10.0, 21.0];
        for _ in 0..20 {
            for current in readings {
                let cmd = controller.compute(&mut pid, 22.0, current, SAMPLE);
                assert!((30.0..=59.0).contains(&cmd.setpoint), "setpoint {}", cmd.setpoint);
                assert_eq!(cmd.mode, HeaterMode::HeatFeedback);
            }
        }
    }

    #[test]
    fn test_integral_is_bounded() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator::default();
        for _ in 0..100 {
            controller.compute(&mut pid, 22.0, 21.0, SAMPLE);
            assert!(pid.integral_error.abs() <= 10.0);
        }
        assert_eq!(pid.integral_error, 10.0);
        for _ in 0..100 {
            controller.compute(&mut pid, 22.0, 80.0, SAMPLE);
            assert!(pid.integral_error.abs() <= 10.0);
        }
        assert_eq!(pid.integral_error, -10.0);
    }

    #[test]
    fn test_first_sample_has_no_derivative_kick() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator::default();
        let cmd = controller.compute(&mut pid, 22.0, 21.5, Duration::from_secs(1));
        // 30 + 29*0.5 + 0.5*0.5, no derivative contribution
        assert!((cmd.setpoint - 44.75).abs() < 1e-9);
    }

    #[test]
    fn test_approach_after_full_output() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator::default();
        let first = controller.compute(&mut pid, 22.0, 20.0, SAMPLE);
        assert_eq!(first.setpoint, 59.0);
        let second = controller.compute(&mut pid, 22.0, 21.5, SAMPLE);
        // 30 + 14.5 + 0.25 + 5*(-1.5/300)
        assert!((second.setpoint - 44.725).abs() < 1e-9);
        assert!(second.setpoint < 59.0);
    }

    #[test]
    fn test_zero_interval_drops_derivative() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator {
            integral_error: 0.0,
            last_error: Some(-3.0),
        };
        let cmd = controller.compute(&mut pid, 22.0, 22.0, Duration::ZERO);
        assert_eq!(cmd.setpoint, 30.0);
    }

    #[test]
    fn test_non_finite_reading_holds_minimum() {
        let controller = SetpointController::default();
        let mut pid = PidAccumulator::default();
        let cmd = controller.compute(&mut pid, 22.0, f64::NAN, SAMPLE);
        assert_eq!(cmd, HeaterCommand::new(HeaterMode::HeatFeedback, 30.0));
        assert_eq!(pid, PidAccumulator::default());
    }

    #[test]
    fn test_inverted_band_never_panics() {
        let config = ControlConfig {
            min_setpoint: 60.0,
            max_setpoint: 100.0,
            ..ControlConfig::default()
        };
        let controller = SetpointController::from_config(&config);
        let mut pid = PidAccumulator::default();
        let cmd = controller.compute(&mut pid, 22.0, 21.5, SAMPLE);
        assert_eq!(cmd, HeaterCommand::new(HeaterMode::HeatFeedback, MAX_SETPOINT));
    }

    #[test]
    fn test_non_finite_tuning_never_panics() {
        let config = ControlConfig {
            min_setpoint: f64::NAN,
            max_setpoint: f64::NAN,
            integral_limit: f64::NAN,
            ..ControlConfig::default()
        };
        let controller = SetpointController::from_config(&config);
        assert_eq!(controller.integral_limit(), 0.0);
        let mut pid = PidAccumulator::default();
        for current in [21.5, 22.0, 23.0] {
            let cmd = controller.compute(&mut pid, 22.0, current, SAMPLE);
            assert!(cmd.setpoint <= MAX_SETPOINT);
        }
        assert_eq!(pid.integral_error, 0.0);
    }

    #[test]
    fn test_custom_gains() {
        let controller = SetpointController::new(10.0, 0.0, 0.0);
        assert_eq!(controller.gains(), (10.0, 0.0, 0.0));
        let mut pid = PidAccumulator::default();
        let cmd = controller.compute(&mut pid, 22.0, 21.0, SAMPLE);
        assert_eq!(cmd.setpoint, 40.0);
    }
}
