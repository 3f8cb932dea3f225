use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use randomart::config::Complexity;
use randomart::{Config, Gallery, Generator, Node, ascii_tree, render_thumbnails, save_image, thumbnail_sheet};

const GALLERY_FILE: &str = "gallery.bin";

#[derive(Parser, Debug)]
#[command(name = "randomart", about = "Random expression-tree art")]
struct Args {
    /// Config file (defaults to ./randomart.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible trees
    #[arg(long)]
    seed: Option<u64>,

    /// Render this many images without prompting, then exit
    #[arg(long)]
    batch: Option<usize>,

    /// Override the render resolution
    #[arg(long)]
    resolution: Option<usize>,
}

struct Session {
    config: Config,
    generator: Generator<StdRng>,
    gallery: Gallery,
    current: String,
}

impl Session {
    fn mint(&mut self, range: Complexity) -> Result<String, Box<dyn std::error::Error>> {
        let tree = self.generator.generate_between(range.min, range.max)?;
        let id = self.gallery.insert(tree);
        self.current = id.clone();
        Ok(id)
    }

    fn tree(&self) -> Option<&Node> {
        self.gallery.get(&self.current)
    }

    fn out_path(&self, arg: Option<&str>, default_name: String) -> PathBuf {
        match arg {
            Some(p) => PathBuf::from(p),
            None => self.config.output_dir.join(default_name),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };
    if let Some(res) = args.resolution {
        config.resolution = res;
    }

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generator = Generator::with_options(rng, config.generator_options());

    let gallery = match Gallery::load(GALLERY_FILE, config.gallery_limit) {
        Ok(g) => g,
        Err(_) => Gallery::new(config.gallery_limit),
    };

    let mut session = Session { config, generator, gallery, current: String::new() };

    if let Some(count) = args.batch {
        for i in 0..count {
            let range = match (i, count) {
                (_, 1) => session.config.default_range,
                (0, _) => session.config.first,
                _ => session.config.higher,
            };
            let id = session.mint(range)?;
            let path = session.out_path(None, format!("{}.png", id));
            if let Some(tree) = session.tree() {
                save_image(tree, session.config.resolution, &path)?;
                tree.save_json(path.with_extension("json"))?;
            }
            println!("[{}/{}] {}", i + 1, count, path.display());
        }
        session.gallery.save(GALLERY_FILE)?;
        return Ok(());
    }

    let id = session.mint(session.config.first)?;

    println!("\n╭──────────────────────────────────────────╮");
    println!("│               random art                 │");
    println!("│                                          │");
    println!("│ trees of color operators over (x, y)     │");
    println!("│                                          │");
    println!("│ /again           - new simple tree       │");
    println!("│ /higher          - new complex tree      │");
    println!("│ /save [path]     - render png            │");
    println!("│ /large [path]    - print-size png        │");
    println!("│ /tree            - ascii dump            │");
    println!("│ /thumbs [path]   - per-node thumbnails   │");
    println!("│ /export [path]   - tree as json          │");
    println!("│ /load <path>     - tree from json        │");
    println!("│ /import <dir>    - all json trees in dir │");
    println!("│ /gallery  /show <id>  /quit              │");
    println!("╰──────────────────────────────────────────╯\n");
    println!("current: {}\n", id);

    loop {
        print!("art: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() { continue; }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let arg = parts.next();

        match command {
            "/quit" => break,
            "/again" => {
                let id = session.mint(session.config.first)?;
                println!("current: {}\n", id);
            }
            "/higher" => {
                let id = session.mint(session.config.higher)?;
                println!("current: {}\n", id);
            }
            "/save" | "/large" => {
                let resolution = if command == "/large" {
                    session.config.large_resolution
                } else {
                    session.config.resolution
                };
                let path = session.out_path(arg, format!("{}.png", session.current));
                if let Some(tree) = session.tree() {
                    println!("rendering {}x{}...", resolution, resolution);
                    match save_image(tree, resolution, &path) {
                        Ok(()) => println!("✓ saved {}\n", path.display()),
                        Err(e) => println!("render error: {}\n", e),
                    }
                }
            }
            "/tree" => {
                if let Some(tree) = session.tree() {
                    println!("{}", ascii_tree(tree));
                }
            }
            "/thumbs" => {
                let path = session.out_path(arg, format!("{}-tree.png", session.current));
                let size = session.config.thumbnail_size;
                if let Some(tree) = session.tree() {
                    match render_thumbnails(tree, size, size) {
                        Ok((_, thumbs)) => {
                            for (index, (label, _)) in &thumbs.images {
                                println!("{:>4}  {}", index, label);
                            }
                            thumbnail_sheet(&thumbs, 64).save(&path)?;
                            println!("✓ {} thumbnails in {}\n", thumbs.len(), path.display());
                        }
                        Err(e) => println!("render error: {}\n", e),
                    }
                }
            }
            "/export" => {
                let path = session.out_path(arg, format!("{}.json", session.current));
                if let Some(tree) = session.tree() {
                    tree.save_json(&path)?;
                    println!("✓ wrote {}\n", path.display());
                }
            }
            "/load" => {
                let Some(path) = arg else {
                    println!("usage: /load <path>\n");
                    continue;
                };
                match Node::load_json(path) {
                    Ok(tree) => {
                        session.current = session.gallery.insert(tree);
                        println!("current: {}\n", session.current);
                    }
                    Err(e) => println!("invalid tree file: {}\n", e),
                }
            }
            "/import" => {
                let Some(dir) = arg else {
                    println!("usage: /import <dir>\n");
                    continue;
                };
                if !Path::new(dir).exists() {
                    println!("error: path does not exist: {}\n", dir);
                    continue;
                }
                let added = session.gallery.import_dir(dir);
                if let Some(last) = added.last() {
                    session.current = last.clone();
                }
                println!("✓ imported {} tree(s)\n", added.len());
            }
            "/gallery" => {
                for id in session.gallery.ids() {
                    let marker = if id == session.current { "*" } else { " " };
                    println!("{} {}", marker, id);
                }
                println!("({} of {})\n", session.gallery.len(), session.gallery.limit());
            }
            "/show" => match arg {
                Some(id) if session.gallery.get(id).is_some() => {
                    session.current = id.to_string();
                    println!("current: {}\n", id);
                }
                Some(id) => println!("no tree {}\n", id),
                None => println!("usage: /show <id>\n"),
            },
            _ => {
                if let Some(tree) = session.tree() {
                    println!("{}\n", tree);
                }
            }
        }
    }

    session.gallery.save(GALLERY_FILE)?;
    Ok(())
}
