use structopt::*;
use std::path::PathBuf;
use anyhow::{bail, Context};
use bayes_curve::basis::{Basis, BasisFunction, BasisKind};
use bayes_curve::calc::Performance;
use bayes_curve::fit::{BayesianModel, FitSettings};
use bayes_curve::table;

/// Bayesian curve fitting: fits a basis-expanded linear model to a numeric
/// series with evidence-maximizing hyperparameters, then predicts one step
/// past the training range.
#[derive(StructOpt, Debug)]
#[structopt(name = "bayes-curve")]
pub struct Opt {

    /// The historical CSV file to be loaded for fitting.
    #[structopt(short, long, parse(from_os_str))]
    file : Option<PathBuf>,

    /// The basis function used for fitting [polynomial|identity|gaussian].
    #[structopt(short, long, default_value = "gaussian")]
    basis : BasisKind,

    /// The degree of the basis function.
    #[structopt(short, long, default_value = "32")]
    degree : usize,

    /// Name of the CSV column holding the series.
    #[structopt(short, long, default_value = "open")]
    column : String,

    /// Number of leading observations used for training.
    #[structopt(long, default_value = "100")]
    train_limit : usize,

    #[structopt(long, default_value = "200")]
    max_iter : usize,

    #[structopt(long, default_value = "1e-12")]
    rtol : f64,

    /// Print the hyperparameters at every iteration.
    #[structopt(short, long)]
    verbose : bool,

    /// Save the fitted model as JSON.
    #[structopt(short, long, parse(from_os_str))]
    output : Option<PathBuf>,

    /// Save the hyperparameter trajectory as JSON.
    #[structopt(long, parse(from_os_str))]
    traj : Option<PathBuf>

}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    let path = match &opt.file {
        Some(path) if path.is_file() => path.clone(),
        _ => {
            eprintln!("Please provide the data file. (Use --help for help)");
            std::process::exit(1);
        }
    };
    let (index, values) = table::load_column(&path, &opt.column)
        .with_context(|| format!("Error loading column '{}' from {}", opt.column, path.display()) )?;
    let n_train = opt.train_limit.min(values.nrows());
    let n_test = (opt.train_limit + 1).min(values.nrows());
    if n_train == 0 {
        bail!("No observations available for training");
    }

    // Inputs are scaled so the training range sits inside [0, 1).
    let x = index / (opt.train_limit + 1) as f64;
    let x_train = x.rows(0, n_train).clone_owned();
    let x_test = x.rows(0, n_test).clone_owned();
    let t = values.rows(0, n_train).clone_owned();

    let basis = BasisFunction::from_kind(opt.basis, opt.degree);
    let phi = basis.generate(&x_train);
    let phi_test = basis.generate(&x_test);

    let settings = FitSettings::default()
        .max_iter(opt.max_iter)
        .rtol(opt.rtol)
        .verbose(opt.verbose);
    let mut model = BayesianModel::default();
    let report = model.fit(&phi, &t, &settings)?;
    if opt.verbose {
        for state in report.trajectory.iter() {
            println!("alpha:{} beta:{}", state.alpha, state.beta);
        }
        if report.converged {
            println!("Convergence after {} iterations.", report.iterations);
        } else {
            println!("Stopped after {} iterations.", report.iterations);
        }
    }

    let pred = model.predict(&phi_test)?;
    println!("{}", Performance::evaluate(&values, &pred.mean)?);
    println!("x,observed,mean,std_dev");
    let std_dev = pred.std_dev();
    for i in 0..pred.len() {
        println!("{},{},{},{}", x_test[i], values[i], pred.mean[i], std_dev[i]);
    }

    if let Some(out) = &opt.output {
        model.save_to_path(out)?;
    }
    if let Some(traj) = &opt.traj {
        report.trajectory.save_to_path(traj)?;
    }
    Ok(())
}
