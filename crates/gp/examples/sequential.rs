use linfa::prelude::*;
use ndarray::{array, s, Array, Array1, Axis};
use reggie_gp::BasicGp;

fn xsinx(x: f64) -> f64 {
    (x - 3.5) * ((x - 3.5) / std::f64::consts::PI).sin()
}

fn argmax(v: &Array1<f64>) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(imax, vmax), (i, &v)| {
            if v > vmax {
                (i, v)
            } else {
                (imax, vmax)
            }
        })
        .0
}

fn main() {
    env_logger::init();

    let xt = array![[0.0], [7.0], [25.0]];
    let yt = xt.column(0).mapv(xsinx);
    let mut gp = BasicGp::params(1e-6, 100., array![5.0])
        .kernel("matern5")
        .fit(&Dataset::new(xt, yt))
        .expect("GP fitting");

    // add the most uncertain point, one at a time
    let xtest = Array::linspace(0., 25., 200).insert_axis(Axis(1));
    for _ in 0..10 {
        let (_, s2) = gp.posterior(&xtest, false).expect("GP posterior");
        let i = argmax(&s2);
        let x = xtest.slice(s![i..i + 1, ..]).to_owned();
        let y = x.column(0).mapv(xsinx);
        gp.add_data(&x, &y).expect("GP update");
        println!("added x = {}, loglike = {}", x[[0, 0]], gp.loglike());
    }

    let ytest = gp.predict(&xtest);
    let yexact = xtest.column(0).mapv(xsinx);
    println!("{gp}");
    println!(
        "max error = {}",
        (&ytest - &yexact).fold(0., |acc: f64, e| acc.max(e.abs()))
    );
}
