use std::cell::{Cell, RefCell};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use mdpopups_core::{
    JsonSettings, Layout, NavigateCallback, PhantomId, PopupOptions, PopupPlacement, Region,
    RenderOptions, View,
};
use mdpopups_renderer::{BundledResources, engine};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCHEME: &str = "base16-ocean.dark";

fn main() {
    let mut input: Option<String> = None;
    let mut scheme = DEFAULT_SCHEME.to_string();
    let mut phantom = false;
    let mut markdown = true;
    let mut line_breaks = true;
    let mut settings_path: Option<String> = None;
    let mut packages: Option<String> = None;
    let mut css_path: Option<String> = None;
    let mut font_size: Option<f32> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-V" | "--version" => {
                let (major, minor, patch) = mdpopups_core::version();
                println!("mdpopups {}.{}.{}", major, minor, patch);
                return;
            }
            "--phantom" => phantom = true,
            "--raw" => markdown = false,
            "--no-line-breaks" => line_breaks = false,
            "--scheme" => scheme = expect_value(&mut args, "--scheme"),
            "--settings" => settings_path = Some(expect_value(&mut args, "--settings")),
            "--packages" => packages = Some(expect_value(&mut args, "--packages")),
            "--css" => css_path = Some(expect_value(&mut args, "--css")),
            "--font-size" => {
                let value = expect_value(&mut args, "--font-size");
                match value.parse::<f32>() {
                    Ok(size) if size > 0.0 => font_size = Some(size),
                    _ => {
                        eprintln!("--font-size expects a positive number, got {}", value);
                        process::exit(2);
                    }
                }
            }
            _ => {
                if input.is_none() {
                    input = Some(arg);
                } else {
                    eprintln!("unexpected argument: {}", arg);
                    print_usage();
                    process::exit(2);
                }
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let source = match input {
        Some(path) => read_file(&path),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .unwrap_or_else(|err| {
                    eprintln!("failed to read stdin: {}", err);
                    process::exit(1);
                });
            buffer
        }
    };

    let settings = match settings_path {
        Some(path) => JsonSettings::from_json_str(&read_file(&path)).unwrap_or_else(|err| {
            eprintln!("invalid settings in {}: {}", path, err);
            process::exit(1);
        }),
        None => JsonSettings::new(),
    };
    let resources = match packages {
        Some(dir) => BundledResources::with_packages_dir(dir),
        None => BundledResources::new(),
    };
    let popups = engine(Box::new(settings), resources);

    debug!(scheme = %scheme, phantom, markdown, "rendering input");
    let view = HeadlessView::new(scheme, font_size, &source);
    let render = RenderOptions {
        markdown,
        css: css_path.as_deref().map(read_file),
        line_breaks,
    };
    if phantom {
        let region = Region::point(0);
        popups.add_phantom(&view, "mdpopups-cli", region, &source, Layout::Block, &render, None);
    } else {
        let options = PopupOptions {
            render,
            placement: PopupPlacement::default(),
        };
        popups.show_popup(&view, &source, &options);
    }

    match view.html.into_inner() {
        Some(html) => println!("{}", html),
        None => {
            eprintln!("nothing rendered: mdpopups.disable is set");
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: mdpopups-cli [--scheme NAME|PATH] [--phantom] [--raw] [--no-line-breaks] \
         [--settings FILE] [--packages DIR] [--css FILE] [--font-size N] [input]"
    );
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("{} expects a value", flag);
        print_usage();
        process::exit(2);
    })
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("failed to read {}: {}", path, err);
        process::exit(1);
    })
}

/// A view over the whole input with the caret at the start. Captures the
/// rendered popup or phantom instead of displaying it.
struct HeadlessView {
    scheme: String,
    font_size: Option<f32>,
    len: i64,
    html: RefCell<Option<String>>,
    visible: Cell<bool>,
}

impl HeadlessView {
    fn new(scheme: String, font_size: Option<f32>, source: &str) -> Self {
        Self {
            scheme,
            font_size,
            len: i64::try_from(source.chars().count()).unwrap_or(i64::MAX),
            html: RefCell::new(None),
            visible: Cell::new(false),
        }
    }
}

impl View for HeadlessView {
    fn color_scheme(&self) -> Option<String> {
        Some(self.scheme.clone())
    }

    fn font_size(&self) -> Option<f32> {
        self.font_size
    }

    fn visible_region(&self) -> Region {
        Region::new(0, self.len)
    }

    fn selections(&self) -> Vec<Region> {
        vec![Region::point(0)]
    }

    fn syntax(&self) -> Option<String> {
        None
    }

    fn show_popup(&self, html: &str, _placement: &PopupPlacement) {
        *self.html.borrow_mut() = Some(html.to_string());
        self.visible.set(true);
    }

    fn update_popup(&self, html: &str) {
        *self.html.borrow_mut() = Some(html.to_string());
    }

    fn hide_popup(&self) {
        self.visible.set(false);
    }

    fn is_popup_visible(&self) -> bool {
        self.visible.get()
    }

    fn add_phantom(
        &self,
        _key: &str,
        _region: Region,
        html: &str,
        _layout: Layout,
        _on_navigate: Option<NavigateCallback>,
    ) -> PhantomId {
        *self.html.borrow_mut() = Some(html.to_string());
        PhantomId(1)
    }

    fn erase_phantoms(&self, _key: &str) {}

    fn erase_phantom_by_id(&self, _id: PhantomId) {}

    fn query_phantom(&self, _id: PhantomId) -> Region {
        Region::point(0)
    }
}
