//! Heater PID controller.
//!
//! Standard PID with two refinements that matter on real enclosures:
//! derivative-on-measurement (so setpoint steps do not kick the heater) and
//! back-calculation anti-windup (the integral is rewound by exactly the
//! amount of output that saturation clipped, so recovery after a long
//! saturated stretch is immediate instead of lagging).

/// PID controller with output clamping and back-calculation anti-windup.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    setpoint: f32,
    integral: f32,
    prev_measurement: f32,
    out_min: f32,
    out_max: f32,
}

impl PidController {
    /// Creates a controller with the default 0..=100 % duty output range.
    pub fn new(kp: f32, ki: f32, kd: f32, setpoint: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            integral: 0.0,
            prev_measurement: 0.0,
            out_min: 0.0,
            out_max: 100.0,
        }
    }

    /// Runs one controller step.
    ///
    /// `dt` is the seconds since the previous step. A non-positive `dt`
    /// returns 0.0 without touching any state, so a stalled or re-winding
    /// clock cannot corrupt the integral.
    pub fn compute(&mut self, measurement: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return 0.0;
        }

        let error = self.setpoint - measurement;

        let p = self.kp * error;

        self.integral += error * dt;
        let i = self.ki * self.integral;

        // Derivative on measurement: immune to setpoint steps.
        let d = -self.kd * (measurement - self.prev_measurement) / dt;
        self.prev_measurement = measurement;

        let raw = p + i + d;
        let output = raw.clamp(self.out_min, self.out_max);

        // Back-calculation: rewind the integral by the clipped amount.
        if self.ki > 0.001 {
            self.integral += (output - raw) / self.ki;
        }

        output
    }

    /// Clears the integral and derivative history. Gains, setpoint and
    /// output limits are untouched.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
    }

    /// Retargets the controller. Accumulated state is kept so a small
    /// setpoint nudge does not drop the output to zero mid-cycle.
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Changes the output clamp range.
    pub fn set_limits(&mut self, out_min: f32, out_max: f32) {
        self.out_min = out_min;
        self.out_max = out_max;
    }
}
