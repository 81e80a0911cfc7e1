use kube::CustomResourceExt;

use books_operator::book::Book;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Book::crd())?);
    Ok(())
}
