//! Prints the Argora CRD manifests as a multi-document YAML stream.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/bases/argora.yaml
//! ```

use crds::{ClusterImport, IPPoolImport, Update};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [Update::crd(), ClusterImport::crd(), IPPoolImport::crd()];
    for crd in &crds {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
