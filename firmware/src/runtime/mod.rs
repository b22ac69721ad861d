use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use waterer_core::controller::{Controller, Peripherals};
use waterer_core::hardware::{LatchedButton, PressLatch, SampledTicks};

use crate::config;
use crate::hw::analog::PotSampler;
use crate::hw::shift_register::ShiftRegister;
use crate::hw::ticks::BlockingTicks;
use crate::hw::{ActiveHighButton, BoardOutputs, RelayValve};
use crate::telemetry::LogTelemetry;

mod waterer_task;

critical_section::set_impl!(InterruptCriticalSection);

static STOP_LATCH: PressLatch = PressLatch::new();

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

type BoardOutputPins = BoardOutputs<
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
>;

type BoardButton = ActiveHighButton<Input<'static>>;

pub(super) type BoardController = Controller<
    PotSampler<'static>,
    BoardOutputPins,
    BoardButton,
    LatchedButton<'static>,
    SampledTicks<'static, BlockingTicks, BoardButton>,
    LogTelemetry,
>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal_config = hal::Config::default();
    let hal::Peripherals {
        ADC1,
        PA1,
        PA2,
        PA3,
        PA4,
        PA5,
        PA6,
        PA7,
        ..
    } = hal::init(hal_config);

    // Relay low before anything else so the valve cannot open during boot.
    let relay = RelayValve::new(Output::new(PA2, Level::Low, Speed::Low));
    let bar = ShiftRegister::new(
        Output::new(PA3, Level::Low, Speed::Low),
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
    );

    let peripherals = Peripherals {
        sampler: PotSampler::new(Adc::new(ADC1), PA1.degrade_adc()),
        outputs: BoardOutputs::new(bar, relay),
        start: ActiveHighButton::new(Input::new(PA7, Pull::Down), "start"),
        // A countdown tick blocks for a full second, so Stop is sampled
        // inside the delay and read back through the latch.
        stop: LatchedButton::new(&STOP_LATCH),
        ticks: SampledTicks::new(
            BlockingTicks,
            ActiveHighButton::new(Input::new(PA6, Pull::Down), "stop"),
            &STOP_LATCH,
            config::STOP_SAMPLE_UNITS,
        ),
    };

    let controller = Controller::new(config::controller_config(), peripherals, LogTelemetry::new())
        .expect("board controller configuration");
    defmt::info!(
        "waterer: boot mode={} tick={}ms",
        config::BAR_GRAPH.label(),
        config::COUNTDOWN_TICK_UNITS
    );

    spawner
        .spawn(waterer_task::run(controller))
        .expect("failed to spawn waterer task");

    core::future::pending::<()>().await;
}
