//! モータードライバー抽象化レイヤー
//!
//! PWMハードウェアへの直接アクセスを隠蔽し、駆動コアが使う
//! デューティ比と転流パターンをTIM1のコンペア値/チャネル有効化に変換します。

use bldc_drive::drive::{PhaseDrive, PhaseState};
use bldc_drive::Duty;
use embassy_stm32::{
    peripherals,
    timer::{complementary_pwm::ComplementaryPwm, Channel},
};

/// 3相モータードライバー
///
/// STM32のComplementaryPwmを使用して3相ブラシレスモーターを駆動します。
pub struct MotorDriver {
    pwm: ComplementaryPwm<'static, peripherals::TIM1>,
    max_duty: u16,
    /// 台形波駆動の相パターン（Noneなら3相同一デューティ）
    pattern: Option<PhaseDrive>,
    /// 最後にコミットされた3相のコンペア値
    compare: (u16, u16, u16),
}

impl MotorDriver {
    /// 新しいモータードライバーを作成（全チャネル無効）
    ///
    /// # 引数
    /// * `pwm` - PWMペリフェラル（TIM1）
    pub fn new(pwm: ComplementaryPwm<'static, peripherals::TIM1>) -> Self {
        let max_duty = pwm.get_max_duty();
        let mut driver = Self {
            pwm,
            max_duty,
            pattern: None,
            compare: (0, 0, 0),
        };
        driver.stop();
        driver
    }

    /// PWMの最大Duty値を取得
    pub fn max_duty(&self) -> u16 {
        self.max_duty
    }

    /// デューティ比をコンペア値に変換
    fn to_compare(&self, duty: Duty) -> u16 {
        let max = u32::from(self.max_duty);
        duty.saturating_mul_int(max).to_num::<u32>().min(max) as u16
    }

    /// 3相全てのDuty比を設定
    ///
    /// # 引数
    /// * `duty_u` - U相のコンペア値
    /// * `duty_v` - V相のコンペア値
    /// * `duty_w` - W相のコンペア値
    pub fn set_duty_uvw(&mut self, duty_u: u16, duty_v: u16, duty_w: u16) {
        self.pwm.set_duty(Channel::Ch1, duty_u);
        self.pwm.set_duty(Channel::Ch2, duty_v);
        self.pwm.set_duty(Channel::Ch3, duty_w);
    }

    /// デューティ比をコミット
    ///
    /// 台形波パターン適用中は High 相にのみデューティ比を与え、Low 相は0（下側常時ON）。
    pub fn set_duty_cycle(&mut self, a: Duty, b: Duty, c: Duty) {
        self.compare = (self.to_compare(a), self.to_compare(b), self.to_compare(c));
        self.apply_compare();
    }

    fn apply_compare(&mut self) {
        let (u, v, w) = self.compare;
        match self.pattern {
            Some(drive) => self.set_duty_uvw(
                phase_compare(drive.a, u),
                phase_compare(drive.b, v),
                phase_compare(drive.c, w),
            ),
            None => self.set_duty_uvw(u, v, w),
        }
    }

    /// ブートストラップ充電: デューティ0で全チャネル有効（下側ON）
    pub fn precharge(&mut self) {
        self.pattern = None;
        self.compare = (0, 0, 0);
        self.set_duty_uvw(0, 0, 0);
        self.enable_all_channels();
    }

    /// 出力有効化（パターンは次の転流で確定）
    pub fn outputs_on(&mut self) {
        self.pattern = None;
        self.apply_compare();
        self.enable_all_channels();
    }

    /// 台形波の転流パターンを適用
    pub fn commutate(&mut self, drive: PhaseDrive) {
        self.pattern = Some(drive);
        self.apply_compare();
        self.set_channels(
            drive.a != PhaseState::Float,
            drive.b != PhaseState::Float,
            drive.c != PhaseState::Float,
        );
    }

    /// 全チャネルを有効化
    pub fn enable_all_channels(&mut self) {
        self.pwm.enable(Channel::Ch1);
        self.pwm.enable(Channel::Ch2);
        self.pwm.enable(Channel::Ch3);
    }

    /// 全チャネルを無効化
    pub fn disable_all_channels(&mut self) {
        self.pwm.disable(Channel::Ch1);
        self.pwm.disable(Channel::Ch2);
        self.pwm.disable(Channel::Ch3);
    }

    /// 全チャネルのDuty比を0にして停止
    pub fn stop(&mut self) {
        self.pattern = None;
        self.compare = (0, 0, 0);
        self.set_duty_uvw(0, 0, 0);
        self.disable_all_channels();
    }

    /// 各チャネルを個別に有効/無効化
    pub fn set_channels(&mut self, enable_u: bool, enable_v: bool, enable_w: bool) {
        for (channel, enable) in [
            (Channel::Ch1, enable_u),
            (Channel::Ch2, enable_v),
            (Channel::Ch3, enable_w),
        ] {
            if enable {
                self.pwm.enable(channel);
            } else {
                self.pwm.disable(channel);
            }
        }
    }
}

fn phase_compare(state: PhaseState, compare: u16) -> u16 {
    match state {
        PhaseState::High => compare,
        PhaseState::Low | PhaseState::Float => 0,
    }
}
