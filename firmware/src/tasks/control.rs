//! 駆動制御タスク
//!
//! 1kHzで操作コマンドを適用し、駆動コアのミリ秒ティックを実行します。

use bldc_drive::{DriveController, Gain, Modulation};
use embassy_time::{Duration, Ticker};

use crate::board::Board;
use crate::config::CONTROL_TICK_MS;
use crate::fmt::*;
use crate::hall_tim;
use crate::state::{self, Command, COMMANDS};

/// 駆動制御タスク（1kHz）
#[embassy_executor::task]
pub async fn control_task() {
    info!("Control task started ({} ms tick)", CONTROL_TICK_MS);

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));

    loop {
        ticker.next().await;

        while let Ok(command) = COMMANDS.try_receive() {
            state::with_drive(|controller, board| apply_command(command, controller, board));
        }

        state::with_drive(|controller, board| {
            controller.millisecond_tick(board);

            // エッジが途絶えている間（起動直後/ストール）は現在のHall状態で転流し直す
            if controller.parameters().modulation == Modulation::Trapezoid
                && controller.is_running()
                && hall_tim::is_timeout()
            {
                controller.hall_edge(hall_tim::read_hall_state(), board);
            }
        });
    }
}

fn apply_command(command: Command, controller: &mut DriveController, board: &mut Board) {
    debug!("command: {}", command);

    match command {
        Command::Run => controller.run(board),
        Command::Stop => controller.stop(board),
        Command::EmergencyStop => controller.emergency_stop(board),
        Command::SetDirection(forward) => controller.set_direction(forward),
        Command::SetTargetSpeed(rpm) => controller.set_target_speed(rpm),
        Command::SetIntegralGain(ki) => controller.set_integral_gain(Gain::from_bits(ki)),
        Command::SetParameters(params) => match controller.set_parameters(params) {
            Ok(()) => board.configure(&params),
            Err(e) => error!("set_parameters rejected: {}", e),
        },
        Command::ClearFaults => {
            if let Err(e) = controller.clear_faults(board) {
                warn!("clear_faults rejected: {}", e);
            }
        }
    }
}
