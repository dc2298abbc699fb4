// File path: crates/ptz-firmware/src/rtic_main.rs

//! # RTIC-based Firmware Entry Point
//!
//! Alternative to the default Embassy-based async executor: a
//! hardware-task-driven architecture where peripherals and interrupts
//! directly trigger firmware logic. The stepper ISR binds to TIM2 at the
//! highest priority; the motion task (planner/controller/homing) runs as
//! a lower-priority periodic software task; the host link is driven by
//! the USART1 RX interrupt.

#![allow(unused_imports)]

#[rtic::app(device = stm32f4xx_hal::pac, dispatchers = [EXTI0, EXTI1, EXTI2, EXTI3])]
mod app {
    use core::cell::RefCell;
    use core::sync::atomic::Ordering;

    use critical_section::Mutex;
    use driver_endstop::Endstops;
    use driver_stepper::{AtomicGpioPort, StepExecutor, Timer as StepTimer};
    use driver_tmc::tmc2209::{SlaveAddress, Tmc2209};
    use heapless::spsc::{Consumer, Producer};
    use motion::planner::{Segment, SegmentConsumer, SegmentProducer};
    use rtic_monotonics::{systick::*, Monotonic};
    use stm32f4xx_hal::{
        gpio::{gpioa, gpiod, ErasedPin, Input, Output, PushPull, Speed},
        pac::{TIM2, USART1, USART2},
        prelude::*,
        serial::{Config as SerialConfig, Event as SerialEvent, Rx, Serial, Tx},
        timer::{CounterUs, Event as TimerEvent},
    };

    use crate::boards::ptz_board::STEP_TICK_RATE_HZ;
    use crate::preset::ArrayPresetStore;
    use crate::stepper::{MotionTask, AXIS_POSITIONS, ESTOP, SEGMENT_QUEUE, AXES};

    const PRESET_SLOTS: usize = 16;

    type LedPin = gpiod::PD12<Output<PushPull>>;
    /// Pan/tilt limit switches. ZOOM has no endstop fitted; its homing
    /// reads the TMC2209's stallguard flag instead.
    type PanTiltEndstops = Endstops<2, ErasedPin<Input>>;
    /// DRV_STATUS reader for the ZOOM driver, over a dedicated UART.
    type ZoomStallReader = Tmc2209<Serial<USART2>>;

    // AI-generated note on architecture mismatch:
    // `StepExecutor` expects peripherals wrapped in `Mutex<RefCell<...>>`,
    // idiomatic for Embassy but not for RTIC. In RTIC, resources are
    // managed by the framework and passed via the context `cx`. These
    // proxy structs bridge RTIC's `local` resources to the `Timer`/
    // `AtomicGpioPort` traits `StepExecutor` expects.
    struct StepperTimerProxy<'a> {
        tim: &'a mut CounterUs<TIM2>,
    }
    impl StepTimer for StepperTimerProxy<'_> {
        fn schedule_next(&mut self, period_ticks: u32) {
            self.tim.start(period_ticks.micros()).unwrap();
        }
        fn stop(&mut self) {
            self.tim.cancel().unwrap();
        }
    }

    // In a real implementation, GpioProxy would wrap GPIO Port peripherals.
    struct GpioProxy;
    impl AtomicGpioPort for GpioProxy {
        fn set_and_clear_atomic(&mut self, _set_mask: u32, _clear_mask: u32) { /* no-op */ }
        fn write(&mut self, _mask: u32) { /* no-op */ }
    }

    #[shared]
    struct Shared {
        usart_tx: Tx<USART1>,
    }

    #[local]
    struct Local {
        led: LedPin,
        step_executor: StepExecutor<AXES>,
        segment_producer: SegmentProducer<'static, AXES>,
        stepper_timer: CounterUs<TIM2>,
        usart_rx: Rx<USART1>,
        motion_task: MotionTask<ArrayPresetStore<PRESET_SLOTS>>,
        pan_tilt_endstops: PanTiltEndstops,
        zoom_stall_reader: ZoomStallReader,
        /// Last tick's snapshot of `AXIS_POSITIONS`, diffed every
        /// `motion_tick` to get the per-axis step delta homing needs.
        last_positions: [i32; AXES],
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("RTIC Init");
        let dp = cx.device;

        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.use_hse(8.MHz()).sysclk(168.MHz()).freeze();

        let systick_mono_token = rtic_monotonics::create_systick_token!();
        Systick::start(cx.core.SYST, clocks.hclk().0, systick_mono_token);

        let gpiod = dp.GPIOD.split();
        let mut led = gpiod.pd12.into_push_pull_output();
        led.set_high();

        let gpioa = dp.GPIOA.split();
        let tx_pin = gpioa.pa9.into_alternate();
        let rx_pin = gpioa.pa10.into_alternate();
        let serial_config = SerialConfig::default().baudrate(115_200.bps());
        let (usart_tx, mut usart_rx) = Serial::new(dp.USART1, (tx_pin, rx_pin), serial_config, &clocks)
            .unwrap()
            .split();
        usart_rx.listen(SerialEvent::Rxne);

        // Pan/tilt limit switches, wired active-high with external pull-downs.
        let pan_endstop = gpioa.pa0.into_floating_input().erase();
        let tilt_endstop = gpioa.pa1.into_floating_input().erase();
        let pan_tilt_endstops = Endstops::new([pan_endstop, tilt_endstop]);

        // ZOOM driver's UART, used only to poll DRV_STATUS for stallguard
        // during sensorless homing; no STEP/DIR traffic rides this line.
        let zoom_tmc_tx = gpioa.pa2.into_alternate();
        let zoom_tmc_rx = gpioa.pa3.into_alternate();
        let zoom_tmc_serial =
            Serial::new(dp.USART2, (zoom_tmc_tx, zoom_tmc_rx), SerialConfig::default().baudrate(115_200.bps()), &clocks)
                .unwrap();
        let zoom_stall_reader = Tmc2209::new(zoom_tmc_serial, SlaveAddress::Default);

        let mut stepper_timer = dp.TIM2.counter_us(&clocks);
        stepper_timer.listen(TimerEvent::Update);

        let (segment_producer, segment_consumer) = unsafe { SEGMENT_QUEUE.split() };
        let step_executor = StepExecutor::new(segment_consumer, 1);

        let store: ArrayPresetStore<PRESET_SLOTS> = ArrayPresetStore::new();
        let motion_task = MotionTask::new(STEP_TICK_RATE_HZ, store);

        motion_tick::spawn().ok();

        defmt::info!("RTIC Init complete.");

        (
            Shared { usart_tx },
            Local {
                led,
                step_executor,
                segment_producer,
                stepper_timer,
                usart_rx,
                motion_task,
                pan_tilt_endstops,
                zoom_stall_reader,
                last_positions: [0; AXES],
            },
        )
    }

    #[idle(local = [led])]
    fn idle(cx: idle::Context) -> ! {
        loop {
            cx.local.led.toggle();
            Systick::delay(500.millis()).unwrap();
        }
    }

    /// Stepper interrupt. Highest priority task.
    #[task(binds = TIM2, local = [step_executor, stepper_timer], priority = 4)]
    fn stepper_isr(cx: stepper_isr::Context) {
        cx.local.stepper_timer.clear_interrupt(TimerEvent::Update);

        let timer_proxy = Mutex::new(RefCell::new(StepperTimerProxy { tim: cx.local.stepper_timer }));
        let step_port_proxy = Mutex::new(RefCell::new(GpioProxy));
        let dir_port_proxy = Mutex::new(RefCell::new(GpioProxy));

        // Shared with the motion task's controller; must be the same
        // instance or a latched fault here would never reach `request_stop`.
        cx.local
            .step_executor
            .on_timer_interrupt(&step_port_proxy, &dir_port_proxy, &timer_proxy, ESTOP.raw());

        for axis in 0..AXES {
            if let Some(position) = cx.local.step_executor.position(axis) {
                AXIS_POSITIONS[axis].store(position, Ordering::Relaxed);
            }
        }
    }

    /// Communication task: reads incoming host bytes and dispatches to the
    /// command adapter.
    #[task(binds = USART1, local = [usart_rx], priority = 2)]
    fn usart_task(cx: usart_task::Context) {
        // TODO: frame bytes into a line, parse a `HostCommand`, call
        // `motion_task::handle_command`, and write the `Response` back
        // through `usart_tx`.
        if let Ok(_byte) = cx.local.usart_rx.read() {}
    }

    /// Periodic motion task: pumps the planner/controller/homing state
    /// machine at a cadence above the segment duration.
    #[task(local = [motion_task, segment_producer, pan_tilt_endstops, zoom_stall_reader, last_positions], priority = 1)]
    async fn motion_tick(cx: motion_tick::Context) {
        loop {
            let mut deltas = [0i32; AXES];
            for axis in 0..AXES {
                let position = AXIS_POSITIONS[axis].load(Ordering::Relaxed);
                deltas[axis] = position.wrapping_sub(cx.local.last_positions[axis]);
                cx.local.last_positions[axis] = position;
            }

            let pan_tilt = cx.local.pan_tilt_endstops.read_states().unwrap_or([false, false]);
            let endstop_trips = [pan_tilt[0], pan_tilt[1], false];
            let stall_trip = cx.local.zoom_stall_reader.is_stalled().unwrap_or(false);

            cx.local.motion_task.tick(cx.local.segment_producer, deltas, endstop_trips, stall_trip);
            Systick::delay(2.millis()).await;
        }
    }
}
