//! ボード実装
//!
//! 駆動コアのポート（PWM出力、転流タイマー、センサー、ブレーキ、ウォッチドッグ、LED）を
//! STM32G431の各ペリフェラルに接続します。

use bldc_drive::config::{Direction, DriveParameters, HallSpacing, Modulation};
use bldc_drive::drive::commutation_drive;
use bldc_drive::ports::{
    BlinkPattern, Brake, CommutationTimer, Indicators, Led, PhaseOutputs, Sensors, SpeedSource,
    Watchdog,
};
use bldc_drive::Duty;
use embassy_stm32::{gpio::Output, peripherals, wdg::IndependentWatchdog};

use crate::fmt::*;
use crate::motor_driver::MotorDriver;
use crate::tasks::led;
use crate::{analog, commutation_timer, hall_tim};

pub struct Board {
    motor: MotorDriver,
    watchdog: IndependentWatchdog<'static, peripherals::IWDG>,
    /// ブレーキ抵抗ドライバ（アクティブLow）
    brake: Output<'static>,
    modulation: Modulation,
    hall_spacing: HallSpacing,
    num_poles: u8,
}

impl Board {
    pub fn new(
        motor: MotorDriver,
        watchdog: IndependentWatchdog<'static, peripherals::IWDG>,
        brake: Output<'static>,
        params: &DriveParameters,
    ) -> Self {
        Self {
            motor,
            watchdog,
            brake,
            modulation: params.modulation,
            hall_spacing: params.hall_spacing,
            num_poles: params.num_poles,
        }
    }

    /// パラメータ更新をボード側の設定に反映
    pub fn configure(&mut self, params: &DriveParameters) {
        self.modulation = params.modulation;
        self.hall_spacing = params.hall_spacing;
        self.num_poles = params.num_poles;
    }
}

impl PhaseOutputs for Board {
    fn set_duty_cycle(&mut self, a: Duty, b: Duty, c: Duty) {
        self.motor.set_duty_cycle(a, b, c);
    }

    fn outputs_precharge(&mut self) {
        self.motor.precharge();
    }

    fn outputs_on(&mut self) {
        self.motor.outputs_on();
    }

    fn outputs_off(&mut self) {
        self.motor.stop();
    }

    fn commutate(&mut self, hall: u8, direction: Direction) {
        match commutation_drive(hall, self.modulation, self.hall_spacing, direction) {
            Some(drive) => self.motor.commutate(drive),
            None => {
                // 無効なHallコード: 全相フロート
                warn!("invalid hall state {}", hall);
                self.motor.set_channels(false, false, false);
            }
        }
    }
}

impl CommutationTimer for Board {
    fn arm_commutation_timer(&mut self, period_us: u32) {
        commutation_timer::arm(period_us);
    }

    fn set_commutation_period(&mut self, period_us: u32) {
        commutation_timer::set_period(period_us);
    }

    fn cancel_commutation_timer(&mut self) {
        commutation_timer::cancel();
    }
}

impl Sensors for Board {
    fn rotor_speed(&mut self, source: SpeedSource) -> u32 {
        match source {
            SpeedSource::DigitalHall => hall_tim::speed_rpm(self.num_poles),
            // 逆起電力/エンコーダ/リニアHallの計測回路はこの基板にないため、Hallタイマーで代用
            SpeedSource::BackEmf | SpeedSource::Encoder | SpeedSource::LinearHall => {
                hall_tim::speed_rpm(self.num_poles)
            }
        }
    }

    fn bus_voltage(&mut self) -> u32 {
        analog::bus_voltage_mv()
    }

    fn phase_current(&mut self) -> i32 {
        analog::phase_current_ma()
    }

    fn ambient_temperature(&mut self) -> i16 {
        analog::temperature_c()
    }
}

impl Brake for Board {
    fn set_brake(&mut self, on: bool) {
        if on {
            self.brake.set_low();
        } else {
            self.brake.set_high();
        }
    }
}

impl Watchdog for Board {
    fn reset_watchdog(&mut self) {
        self.watchdog.pet();
    }
}

impl Indicators for Board {
    fn set_indicator(&mut self, led: Led, pattern: BlinkPattern) {
        led::set_pattern(led, pattern);
    }
}
