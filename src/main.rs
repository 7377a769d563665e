use records_admin::RecordsAdmin;

fn main() {
    match RecordsAdmin::from_args() {
        Ok(mut admin) => {
            if let Err(e) = admin.run() {
                eprintln!("运行失败: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("初始化失败: {}", e);
            std::process::exit(1);
        }
    }
}
