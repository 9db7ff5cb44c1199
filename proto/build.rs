use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=library.proto");

    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
    }

    let out_dir = PathBuf::from("src/generated");
    std::fs::create_dir_all(&out_dir).expect("Failed to create src/generated");
    let descriptor_path = out_dir.join("catalog_descriptor.bin");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .file_descriptor_set_path(&descriptor_path)
        .compile_protos(&["library.proto"], &["."])
        .expect("Failed to compile proto files");
}
