#![no_std]
#![no_main]

// fmt は他のモジュールより先に宣言する（マクロのテキストスコープ）
mod fmt;

mod analog;
mod board;
mod commutation_timer;
mod config;
mod hall_tim;
mod hardware;
mod motor_driver;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use bldc_drive::DriveController;
use embassy_executor::Spawner;
use embassy_stm32::{
    adc::{Adc, AdcChannel, SampleTime},
    gpio::{Level, Output, OutputType, Speed},
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
    },
    wdg::IndependentWatchdog,
};
use embassy_time::{Duration, Timer};

use board::Board;
use fmt::*;
use motor_driver::MotorDriver;
use state::{Command, Drive, COMMANDS};
use tasks::{analog_monitor_task, control_task, led_task, AnalogInputs};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════════════════");
    info!("        BLDC Drive • STM32G431VB @ 170MHz");
    info!("═══════════════════════════════════════════════════════════════════");

    let watchdog_reset = hardware::take_watchdog_reset();

    // LED初期化＆タスク起動
    let run_led = Output::new(p.PC13, Level::Low, Speed::Low);
    let fault_led = Output::new(p.PC14, Level::Low, Speed::Low);
    spawner.spawn(led_task(run_led, fault_led)).unwrap();

    // ADC初期化＆アナログ監視タスク起動
    // PC1 = ADC2_IN7（バス電圧）、PA0 = ADC1_IN1（相電流）、PA3 = ADC1_IN4（温度）
    let mut adc1 = Adc::new(p.ADC1);
    adc1.set_sample_time(SampleTime::CYCLES47_5);
    let mut adc2 = Adc::new(p.ADC2);
    adc2.set_sample_time(SampleTime::CYCLES47_5);
    let inputs = AnalogInputs {
        adc1,
        adc2,
        vbus: p.PC1.degrade_adc(),
        current: p.PA0.degrade_adc(),
        temperature: p.PA3.degrade_adc(),
    };
    spawner.spawn(analog_monitor_task(inputs)).unwrap();

    // PWM初期化（TIM1、3相補完PWM）
    let mut uvw_pwm = ComplementaryPwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PE9, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE8, OutputType::PushPull)),
        Some(PwmPin::new(p.PE11, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE10, OutputType::PushPull)),
        Some(PwmPin::new(p.PE13, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE12, OutputType::PushPull)),
        None,
        None,
        config::pwm::DEFAULT_FREQUENCY,
        CountingMode::EdgeAlignedUp,
    );
    uvw_pwm.set_dead_time(config::pwm::DEFAULT_DEAD_TIME);
    let motor = MotorDriver::new(uvw_pwm);
    info!("PWM initialized: max duty = {}", motor.max_duty());

    // 駆動コア
    let params = config::drive_parameters();
    let controller = unwrap!(DriveController::new(params));

    // ウォッチドッグ起動（以降は制御タスクが毎ティックリセット）
    let mut watchdog = IndependentWatchdog::new(p.IWDG, config::watchdog::DEFAULT_TIMEOUT_US);
    watchdog.unleash();

    // ブレーキ抵抗ドライバ（PB0、アクティブLow、初期OFF）
    let brake = Output::new(p.PB0, Level::High, Speed::Low);

    let board = Board::new(motor, watchdog, brake, &params);
    state::install(Drive { controller, board });

    if watchdog_reset {
        error!("Reset by independent watchdog");
        state::with_drive(|controller, board| controller.watchdog_expired(board));
    }

    // 割り込み駆動のタイマーは駆動コンテキスト登録後に開始
    unsafe {
        hardware::init_timers();
        hardware::enable_pwm_update_interrupt();
    }

    spawner.spawn(control_task()).unwrap();
    info!(
        "Drive started: {} poles, {}",
        params.num_poles, params.modulation
    );

    if config::DEFAULT_AUTO_RUN {
        COMMANDS
            .send(Command::SetTargetSpeed(config::DEFAULT_AUTO_RUN_SPEED))
            .await;
        COMMANDS.send(Command::Run).await;
    }

    // メインループ: ステータスログ
    loop {
        Timer::after(Duration::from_millis(config::STATUS_LOG_PERIOD_MS)).await;

        if let Some(status) = state::status() {
            info!(
                "[Drive] {} cmd={}RPM meas={}RPM target={}RPM duty={=u32:#x} hall={} brake={} faults={}",
                status.state,
                status.speed_rpm,
                status.measured_rpm,
                status.target_rpm,
                status.duty_cycle.to_bits(),
                hall_tim::last_hall_state(),
                status.brake,
                status.faults
            );
            debug!("[Drive] {}", status.readings);
        }
    }
}
