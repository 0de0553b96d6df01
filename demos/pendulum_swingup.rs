use trajopt::env::Pendulum;
use trajopt::noise::NoiseConfig;
use trajopt::optimizer::{Mppi, OptimizerConfig};
use trajopt::video::Y4mWriter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Swinging up a pendulum with MPPI");

    let config = OptimizerConfig {
        horizon: 32,
        num_workers: 4,
        paths_per_worker: 16,
        kappa: 10.0,
        max_steps: Some(150),
        num_iterations: 2,
        noise: NoiseConfig {
            sigma: vec![0.6],
            ..NoiseConfig::default()
        },
        ..OptimizerConfig::default()
    };
    let mut agent = Mppi::new(Pendulum::new(200), config)?;

    while let Some(report) = agent.step().await? {
        if report.step % 25 == 0 {
            println!(
                "step {:>3}: reward {:>8.3}  best return {:>9.3}",
                report.step, report.reward, report.best_return
            );
        }
    }

    let record = agent.into_record();
    println!(
        "total reward {:.3} over {} steps, solved: {}",
        record.total_reward(),
        record.num_steps(),
        record.any_solved()
    );

    let mut writer = Y4mWriter::create("pendulum_swingup.y4m", 30)?;
    let mut env = Pendulum::new(200);
    record.render_result(&mut env, &mut writer)?;
    println!("wrote {} frames to {}", writer.frames_written(), writer.path().display());
    Ok(())
}
