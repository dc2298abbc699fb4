//! Command adapter (C6): host serial tokens in, controller calls out.
//!
//! One parsed [`HostCommand`] maps to one controller call and one
//! [`Response`]; the adapter owns no state of its own. Line framing and
//! tokenizing are left to the serial driver that calls `dispatch` — this
//! module only knows about the parsed command and the reply text, the
//! same split the original prototype's G-code dispatcher kept between
//! its UART ISR and its command table.

use core::fmt;

use crate::axis::AxisId;
use crate::controller::{ControllerError, Mode, MotionController};
use crate::preset::{PresetRecord, PresetStore};

/// A single parsed host command.
#[derive(Debug, Clone, Copy)]
pub enum HostCommand {
    /// `VEL pan tilt zoom`, full steps/s.
    Vel { pan: f32, tilt: f32, zoom: f32 },
    /// `GOTO n`.
    Goto { preset: u16 },
    /// `SAVE n`.
    Save { preset: u16 },
    /// `HOME`.
    Home,
    /// `POS`.
    Pos,
    /// `STATUS`.
    Status,
    /// `STOP`.
    Stop,
    /// `PRECISION 0|1`.
    Precision { enabled: bool },
    /// `LIMITS axis min max`.
    Limits { axis: AxisId, min: i32, max: i32 },
}

/// Wire error codes, exactly as spec'd: `ERR:{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by current mode.
    Busy,
    /// Would cross a soft limit.
    Limit,
    /// Malformed or out-of-range argument.
    Arg,
    /// ESTOP is latched.
    Fault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ErrorKind::Busy => "BUSY",
            ErrorKind::Limit => "LIMIT",
            ErrorKind::Arg => "ARG",
            ErrorKind::Fault => "FAULT",
        };
        write!(f, "{token}")
    }
}

/// Reply to a dispatched command.
#[derive(Debug, Clone, Copy)]
pub enum Response {
    Ok,
    /// A `GOTO` was accepted; the caller still owes the planner a
    /// `submit_profile` call using the carried record once it reads
    /// `MotionController::has_pending_transition` (MANUAL origin) or
    /// immediately (IDLE origin). The wire reply is still plain `OK`.
    GotoAccepted(PresetRecord),
    Err(ErrorKind),
    Pos { pan: i32, tilt: i32, zoom: i32 },
    Status { mode: Mode, homed: bool, precision: bool, estop: bool },
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok | Response::GotoAccepted(_) => write!(f, "OK"),
            Response::Err(kind) => write!(f, "ERR:{kind}"),
            Response::Pos { pan, tilt, zoom } => write!(f, "POS:{pan},{tilt},{zoom}"),
            Response::Status { mode, homed, precision, estop } => write!(
                f,
                "STATUS:{},{},{},{}",
                mode_token(*mode),
                *homed as u8,
                *precision as u8,
                *estop as u8
            ),
        }
    }
}

fn mode_token(mode: Mode) -> &'static str {
    match mode {
        Mode::Idle => "idle",
        Mode::Manual => "manual",
        Mode::Profiled => "profiled",
        Mode::Homing => "homing",
        Mode::Estop => "estop",
    }
}

fn controller_err_to_response(err: ControllerError) -> Response {
    match err {
        ControllerError::Busy => Response::Err(ErrorKind::Busy),
        ControllerError::Fault => Response::Err(ErrorKind::Fault),
    }
}

/// Dispatches one parsed command against the controller and preset
/// store, returning the reply to write back to the host.
pub fn dispatch<S: PresetStore>(
    controller: &mut MotionController<'_, 3>,
    store: &mut S,
    command: HostCommand,
) -> Response {
    match command {
        HostCommand::Vel { pan, tilt, zoom } => {
            match controller.request_velocity([pan, tilt, zoom]) {
                Ok(_shaped) => Response::Ok,
                Err(e) => controller_err_to_response(e),
            }
        }
        HostCommand::Goto { preset } => {
            let Some(record) = store.load(preset) else {
                return Response::Err(ErrorKind::Arg);
            };
            match controller.request_goto() {
                Ok(()) => Response::GotoAccepted(record),
                Err(e) => controller_err_to_response(e),
            }
        }
        HostCommand::Save { preset } => {
            let record = PresetRecord {
                targets: [
                    controller.axis(0).position(),
                    controller.axis(1).position(),
                    controller.axis(2).position(),
                ],
                duration_s: 0.0,
                easing: motion::Easing::Quintic,
                approach: crate::preset::ApproachMode::Direct,
                speed_multiplier: 1.0,
                accel_multiplier: 1.0,
                precision: controller.precision_enabled(),
            };
            match store.save(preset, record) {
                Ok(()) => Response::Ok,
                Err(_) => Response::Err(ErrorKind::Arg),
            }
        }
        HostCommand::Home => match controller.request_home() {
            Ok(()) => Response::Ok,
            Err(e) => controller_err_to_response(e),
        },
        HostCommand::Pos => Response::Pos {
            pan: controller.axis(0).position(),
            tilt: controller.axis(1).position(),
            zoom: controller.axis(2).position(),
        },
        HostCommand::Status => Response::Status {
            mode: controller.mode(),
            homed: (0..3).all(|i| controller.axis(i).homed()),
            precision: controller.precision_enabled(),
            estop: controller.is_estop(),
        },
        HostCommand::Stop => {
            controller.request_stop();
            Response::Ok
        }
        HostCommand::Precision { enabled } => {
            controller.set_precision(enabled);
            Response::Ok
        }
        HostCommand::Limits { axis, min, max } => {
            if min >= max {
                return Response::Err(ErrorKind::Arg);
            }
            controller.axis_mut(axis.index()).set_soft_limits(min, max);
            Response::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisConfig, AxisState};
    use crate::preset::PresetStoreError;
    use core::fmt::Write as _;

    /// No `alloc` on this target, so render via `heapless::String` rather
    /// than `ToString`.
    fn render(response: Response) -> heapless::String<32> {
        let mut buf = heapless::String::new();
        write!(buf, "{response}").unwrap();
        buf
    }

    struct FakeStore {
        slot: Option<(u16, PresetRecord)>,
    }

    impl PresetStore for FakeStore {
        fn load(&self, id: u16) -> Option<PresetRecord> {
            self.slot.filter(|(slot_id, _)| *slot_id == id).map(|(_, r)| r)
        }
        fn save(&mut self, id: u16, record: PresetRecord) -> Result<(), PresetStoreError> {
            self.slot = Some((id, record));
            Ok(())
        }
    }

    fn controller(estop: &crate::safety::EstopLatch) -> MotionController<'_, 3> {
        let config = AxisConfig::new(16, 2000.0, 2000.0, -10_000, 10_000, 500.0, 100.0, 800, 20_000, 500);
        MotionController::new([AxisState::new(config), AxisState::new(config), AxisState::new(config)], estop)
    }

    #[test]
    fn vel_ok_response_is_ok() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Vel { pan: 1.0, tilt: 0.0, zoom: 0.0 });
        assert_eq!(render(r), "OK");
    }

    #[test]
    fn goto_unknown_preset_is_err_arg() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Goto { preset: 3 });
        assert_eq!(render(r), "ERR:ARG");
    }

    #[test]
    fn goto_busy_while_profiled() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        c.request_goto().unwrap();
        let mut store = FakeStore {
            slot: Some((
                3,
                PresetRecord {
                    targets: [0, 0, 0],
                    duration_s: 1.0,
                    easing: motion::Easing::Quintic,
                    approach: crate::preset::ApproachMode::Direct,
                    speed_multiplier: 1.0,
                    accel_multiplier: 1.0,
                    precision: false,
                },
            )),
        };
        let r = dispatch(&mut c, &mut store, HostCommand::Goto { preset: 3 });
        assert_eq!(render(r), "ERR:BUSY");
    }

    #[test]
    fn pos_formats_as_csv() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        c.report_position(0, 100);
        c.report_position(1, -5);
        c.report_position(2, 0);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Pos);
        assert_eq!(render(r), "POS:100,-5,0");
    }

    #[test]
    fn status_formats_mode_homed_precision_estop() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Status);
        assert_eq!(render(r), "STATUS:idle,0,0,0");
    }

    #[test]
    fn limits_rejects_inverted_bounds() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Limits { axis: AxisId::Pan, min: 100, max: -100 });
        assert_eq!(render(r), "ERR:ARG");
    }

    #[test]
    fn limits_applies_new_bounds() {
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Limits { axis: AxisId::Zoom, min: -500, max: 500 });
        assert_eq!(render(r), "OK");
        assert_eq!(c.axis(AxisId::Zoom.index()).soft_limit_min(), -500);
        assert_eq!(c.axis(AxisId::Zoom.index()).soft_limit_max(), 500);
    }

    #[test]
    fn stop_from_estop_clears_and_returns_ok() {
        use crate::safety::FaultReason;
        let estop = crate::safety::EstopLatch::new();
        let mut c = controller(&estop);
        c.trigger_fault(FaultReason::QueueOverrun);
        let mut store = FakeStore { slot: None };
        let r = dispatch(&mut c, &mut store, HostCommand::Stop);
        assert_eq!(render(r), "OK");
        assert_eq!(c.mode(), Mode::Idle);
    }
}
