//! # Embassy Main
//!
//! Entry point for the firmware when built against the Embassy executor.
//! Initializes the board, constructs the motion task, and spawns the
//! concurrent tasks.

use core::sync::atomic::Ordering;

use driver_endstop::Endstops;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Pull};
use embassy_stm32::Config;

use crate::boards::ptz_board::{BoardPins, STEP_TICK_RATE_HZ};
use crate::preset::ArrayPresetStore;
use crate::{proto_bridge, stepper};

/// Number of preset slots carried in RAM.
const PRESET_SLOTS: usize = 16;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("Initializing PTZ motion firmware...");

    let config = Config::default();
    let p = embassy_stm32::init(config);
    let board_pins = BoardPins::new(p);

    let store: ArrayPresetStore<PRESET_SLOTS> = ArrayPresetStore::new();
    let motion_task = stepper::MotionTask::new(STEP_TICK_RATE_HZ, store);

    let pan_endstop = Input::new(board_pins.pan_endstop, Pull::Down);
    let tilt_endstop = Input::new(board_pins.tilt_endstop, Pull::Down);
    let pan_tilt_endstops = Endstops::new([pan_endstop, tilt_endstop]);
    // ZOOM has no endstop fitted; the DRV_STATUS stallguard flag would
    // normally be polled over UART, but Embassy's async UART driver
    // doesn't implement the blocking `embedded-hal` serial traits
    // `driver-tmc` needs, so this reads the DIAG pin directly instead.
    let zoom_stall = Input::new(board_pins.zoom_stall, Pull::Down);

    spawner.spawn(proto_bridge::proto_task(p.USART1, board_pins.uart_rx, board_pins.uart_tx)).unwrap();
    spawner.spawn(stepper::stepper_task()).unwrap();
    spawner.spawn(motion_task_runner(motion_task, pan_tilt_endstops, zoom_stall)).unwrap();
    spawner.spawn(led_task(board_pins.led)).unwrap();

    defmt::info!("Initialization complete. All tasks are running.");
}

/// Pumps the planner/controller/homing state machine at a cadence well
/// above the segment duration, per `MotionPlanner::pump`'s contract.
#[embassy_executor::task]
async fn motion_task_runner(
    mut task: stepper::MotionTask<ArrayPresetStore<PRESET_SLOTS>>,
    pan_tilt_endstops: Endstops<2, Input<'static>>,
    zoom_stall: Input<'static>,
) {
    use embassy_time::{Duration, Timer};

    let (mut producer, _consumer) = unsafe { stepper::SEGMENT_QUEUE.split() };
    let mut last_positions = [0i32; stepper::AXES];

    loop {
        let mut deltas = [0i32; stepper::AXES];
        for axis in 0..stepper::AXES {
            let position = stepper::AXIS_POSITIONS[axis].load(Ordering::Relaxed);
            deltas[axis] = position.wrapping_sub(last_positions[axis]);
            last_positions[axis] = position;
        }

        let pan_tilt = pan_tilt_endstops.read_states().unwrap_or([false, false]);
        let endstop_trips = [pan_tilt[0], pan_tilt[1], false];
        let stall_trip = zoom_stall.is_high();

        task.tick(&mut producer, deltas, endstop_trips, stall_trip);
        Timer::after(Duration::from_millis(2)).await;
    }
}

#[embassy_executor::task]
async fn led_task(led_pin: embassy_stm32::gpio::AnyPin) {
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_time::{Duration, Timer};
    let mut led = Output::new(led_pin, Level::High, Speed::Low);

    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
