use super::BoardController;

/// Owns the controller for the life of the firmware. The loop blocks on the
/// tick source, so this is the only task doing work.
#[embassy_executor::task]
pub async fn run(mut controller: BoardController) -> ! {
    controller.run()
}
