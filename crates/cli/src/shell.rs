//! Line-oriented front-end over [`Marketplace`].

use std::str::FromStr;

use anyhow::{Context, Result};
use samansetu_core::{
    error::{CommandError, SearchError},
    models::{
        Credentials, EntityId, NewInquiry, NewProduct, NewStorehouse, Product, ProductPatch, Role,
        Storehouse,
    },
    navigation::{self, Navigator},
    session::guard,
    Marketplace, SearchAggregator,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  login <owner|buyer> <email> <password>
  signup <owner|buyer> <email> <password>
  logout
  whoami
  storehouses                                   (owner)
  new-storehouse <name> [location] [description] (owner)
  products <storehouse-id>                      (owner)
  all-products                                  (buyer)
  new-product <storehouse-id> <name> <total> <sold> <price> [description] (owner)
  update-product <id> <field=value>...          (owner; name, total, sold, price, description)
  delete-product <id>                           (owner)
  inquire <product-id> <quantity> <message>     (buyer)
  search <query>
  help
  quit
Quote arguments containing spaces: new-storehouse \"North Barn\" Nashik";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Login(Role, Credentials),
    Signup(Role, Credentials),
    Logout,
    WhoAmI,
    Storehouses,
    NewStorehouse(NewStorehouse),
    Products(EntityId),
    AllProducts,
    NewProduct(NewProduct),
    UpdateProduct(EntityId, ProductPatch),
    DeleteProduct(EntityId),
    Inquire(NewInquiry),
    Search(String),
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words = tokenize(line)?;
        let Some((name, args)) = words.split_first() else {
            return Err("empty command".to_string());
        };

        let command = match name.as_str() {
            "login" | "signup" => {
                let [role, email, password] = args else {
                    return Err(format!("usage: {name} <owner|buyer> <email> <password>"));
                };
                let role = role.parse::<Role>()?;
                let credentials = Credentials::new(email.as_str(), password.as_str());
                if name == "login" {
                    ShellCommand::Login(role, credentials)
                } else {
                    ShellCommand::Signup(role, credentials)
                }
            }
            "logout" => ShellCommand::Logout,
            "whoami" => ShellCommand::WhoAmI,
            "storehouses" => ShellCommand::Storehouses,
            "new-storehouse" => match args {
                [name, rest @ ..] if rest.len() <= 2 => ShellCommand::NewStorehouse(NewStorehouse {
                    name: name.clone(),
                    location: rest.first().cloned(),
                    description: rest.get(1).cloned(),
                }),
                _ => return Err("usage: new-storehouse <name> [location] [description]".to_string()),
            },
            "products" => match args {
                [id] => ShellCommand::Products(number(id, "storehouse id")?),
                _ => return Err("usage: products <storehouse-id>".to_string()),
            },
            "all-products" => ShellCommand::AllProducts,
            "new-product" => match args {
                [storehouse, name, total, sold, price, rest @ ..] if rest.len() <= 1 => {
                    ShellCommand::NewProduct(NewProduct {
                        name: name.clone(),
                        total_quantity: number(total, "total")?,
                        quantity_sold: number(sold, "sold")?,
                        price_per_unit: number(price, "price")?,
                        description: rest.first().cloned(),
                        storehouse_id: number(storehouse, "storehouse id")?,
                    })
                }
                _ => {
                    return Err(
                        "usage: new-product <storehouse-id> <name> <total> <sold> <price> [description]"
                            .to_string(),
                    )
                }
            },
            "update-product" => match args {
                [id, fields @ ..] if !fields.is_empty() => {
                    ShellCommand::UpdateProduct(number(id, "product id")?, patch(fields)?)
                }
                _ => return Err("usage: update-product <id> <field=value>...".to_string()),
            },
            "delete-product" => match args {
                [id] => ShellCommand::DeleteProduct(number(id, "product id")?),
                _ => return Err("usage: delete-product <id>".to_string()),
            },
            "inquire" => match args {
                [product, quantity, message @ ..] if !message.is_empty() => {
                    ShellCommand::Inquire(NewInquiry {
                        product_id: number(product, "product id")?,
                        quantity: number(quantity, "quantity")?,
                        message: message.join(" "),
                    })
                }
                _ => return Err("usage: inquire <product-id> <quantity> <message>".to_string()),
            },
            "search" => ShellCommand::Search(args.join(" ")),
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(command)
    }
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if started {
        words.push(current);
    }
    Ok(words)
}

fn number<T: FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{what} must be a number, got '{raw}'"))
}

fn patch(fields: &[String]) -> Result<ProductPatch, String> {
    let mut patch = ProductPatch::default();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| format!("expected field=value, got '{field}'"))?;
        match key {
            "name" => patch.name = Some(value.to_string()),
            "total" => patch.total_quantity = Some(number(value, key)?),
            "sold" => patch.quantity_sold = Some(number(value, key)?),
            "price" => patch.price_per_unit = Some(number(value, key)?),
            "description" => patch.description = Some(value.to_string()),
            other => return Err(format!("unknown product field '{other}'")),
        }
    }
    Ok(patch)
}

/// Prints where a view change would take the user.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        match path {
            navigation::LOGIN => println!("-> {path}: please log in first"),
            navigation::UNAUTHORIZED => println!("-> {path}: not available for your role"),
            _ => println!("-> {path}"),
        }
    }
}

pub struct Shell {
    market: Marketplace,
    search: SearchAggregator,
    navigator: TerminalNavigator,
}

impl Shell {
    pub fn new(market: Marketplace) -> Self {
        Self {
            search: SearchAggregator::new(market.clone()),
            market,
            navigator: TerminalNavigator,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(io::stdin()).lines();
        let mut stdout = io::stdout();

        match self.market.session().identity() {
            Some(identity) => println!("Welcome back, {} ({})", identity.email, identity.role),
            None => println!("SamanSetu marketplace. Type 'help' for commands."),
        }

        loop {
            stdout.write_all(self.prompt().as_bytes()).await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await.context("failed to read input")? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ShellCommand>() {
                Ok(ShellCommand::Quit) => break,
                Ok(command) => {
                    debug!(?command, "running shell command");
                    self.execute(command).await;
                }
                Err(message) => println!("{message}"),
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.market.session().identity() {
            Some(identity) => format!("{}@samansetu> ", identity.role),
            None => "samansetu> ".to_string(),
        }
    }

    /// `true` when the current session may open a view for `role`.
    fn allowed(&self, role: Option<Role>) -> bool {
        guard(self.market.authorize(role), &self.navigator)
    }

    async fn execute(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Login(role, credentials) => {
                if let Ok(session) = self.market.login(role, &credentials).await {
                    println!("Signed in as {} ({})", session.identity().email, session.role());
                    self.navigator.navigate(navigation::HOME);
                }
            }
            ShellCommand::Signup(role, credentials) => {
                if self.market.register(role, &credentials).await.is_ok() {
                    self.navigator.navigate(navigation::LOGIN);
                }
            }
            ShellCommand::Logout => {
                if !self.market.logout() {
                    println!("Not signed in");
                }
            }
            ShellCommand::WhoAmI => match self.market.session().identity() {
                Some(identity) => println!(
                    "#{} {} ({}) since {}",
                    identity.id,
                    identity.email,
                    identity.role,
                    identity.created_at.format("%Y-%m-%d")
                ),
                None => println!("Not signed in"),
            },
            ShellCommand::Storehouses => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.fetch_storehouses().await;
                    self.show(result, |rows| print_storehouses(rows));
                }
            }
            ShellCommand::NewStorehouse(storehouse) => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.create_storehouse(storehouse).await;
                    self.show(result, |created| {
                        print_storehouses(std::slice::from_ref(created))
                    });
                }
            }
            ShellCommand::Products(storehouse_id) => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.fetch_products_by_storehouse(storehouse_id).await;
                    self.show(result, |rows| print_products(rows));
                }
            }
            ShellCommand::AllProducts => {
                if self.allowed(Some(Role::Buyer)) {
                    let result = self.market.fetch_all_products().await;
                    self.show(result, |rows| print_products(rows));
                }
            }
            ShellCommand::NewProduct(product) => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.create_product(product).await;
                    self.show(result, |created| print_products(std::slice::from_ref(created)));
                }
            }
            ShellCommand::UpdateProduct(id, patch) => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.update_product(id, patch).await;
                    self.show(result, |updated| print_products(std::slice::from_ref(updated)));
                }
            }
            ShellCommand::DeleteProduct(id) => {
                if self.allowed(Some(Role::Owner)) {
                    let result = self.market.delete_product(id).await;
                    self.show(result, |_| {});
                }
            }
            ShellCommand::Inquire(inquiry) => {
                if self.allowed(Some(Role::Buyer)) {
                    let result = self.market.create_inquiry(inquiry).await;
                    self.show(result, |sent| {
                        println!("inquiry #{} for product #{}", sent.id, sent.product_id)
                    });
                }
            }
            ShellCommand::Search(query) => self.run_search(&query).await,
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => {}
        }
    }

    async fn run_search(&self, query: &str) {
        match self.search.search_current(query).await {
            Ok(outcome) if outcome.is_empty() => println!("No results for '{}'", outcome.query),
            Ok(outcome) => {
                for hit in &outcome.results {
                    let kind = match hit {
                        samansetu_core::SearchResult::Product(_) => "product",
                        samansetu_core::SearchResult::Storehouse(_) => "storehouse",
                    };
                    println!(
                        "{kind:<10} #{:<5} {:<24} {}",
                        hit.id(),
                        hit.name(),
                        hit.route()
                    );
                }
            }
            Err(SearchError::EmptyQuery) => self.navigator.navigate(navigation::HOME),
            Err(SearchError::Unauthenticated) => self.navigator.navigate(navigation::LOGIN),
            Err(SearchError::WrongRole { .. }) => {
                self.navigator.navigate(navigation::UNAUTHORIZED)
            }
        }
    }

    /// Render a command result; failures were already announced by the relay.
    fn show<T>(&self, result: Result<T, CommandError>, render: impl FnOnce(&T)) {
        match result {
            Ok(value) => render(&value),
            Err(err) if err.requires_login() => self.navigator.navigate(navigation::LOGIN),
            Err(CommandError::AuthorizationDenied { .. }) => {
                self.navigator.navigate(navigation::UNAUTHORIZED)
            }
            Err(_) => {}
        }
    }
}

fn print_storehouses(rows: &[Storehouse]) {
    if rows.is_empty() {
        println!("(no storehouses)");
    }
    for storehouse in rows {
        println!(
            "#{:<5} {:<24} {}",
            storehouse.id,
            storehouse.name,
            storehouse.location.as_deref().unwrap_or("-")
        );
    }
}

fn print_products(rows: &[Product]) {
    if rows.is_empty() {
        println!("(no products)");
    }
    for product in rows {
        println!(
            "#{:<5} {:<24} {:>6} available  {:>8.2}/unit  storehouse #{}",
            product.id,
            product.name,
            product.available_quantity,
            product.price_per_unit,
            product.storehouse_id
        );
    }
}
